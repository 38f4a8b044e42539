use crate::seed::LoadMode;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Load {
        path: PathBuf,
        mode: LoadMode,
    },
    Validate {
        path: PathBuf,
    },
    Courses,
    Outline {
        course: String,
    },
    Resequence {
        course: String,
        module: Option<String>,
    },
    Reorder {
        course: String,
        slugs: Vec<String>,
    },
    RemoveModule {
        course: String,
        module: String,
    },
    Clone {
        source: String,
        new_slug: String,
        title: String,
    },
    FixCertTracks,
    Audit,
    Stats,
    Help,
    Quit,
    Unknown(String),
}

pub const USAGE: &str = "可用命令: load <path> [--update] | validate <path> | courses | outline <course> | resequence <course> [module] | reorder <course> <slug,slug,...> | remove-module <course> <module> | clone <source> <new-slug> <title...> | fix-cert-tracks | audit | stats | help | quit";

impl AppCommand {
    /// Commands that write to the catalog; the console refreshes afterwards.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            AppCommand::Load { .. }
                | AppCommand::Resequence { .. }
                | AppCommand::Reorder { .. }
                | AppCommand::RemoveModule { .. }
                | AppCommand::Clone { .. }
                | AppCommand::FixCertTracks
        )
    }
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "load" => {
                let update = parts[1..].iter().any(|p| *p == "--update" || *p == "-u");
                let path = parts[1..]
                    .iter()
                    .find(|p| !p.starts_with('-'))
                    .map(PathBuf::from);
                match path {
                    Some(path) => Ok(AppCommand::Load {
                        path,
                        mode: if update {
                            LoadMode::Update
                        } else {
                            LoadMode::CreateOnly
                        },
                    }),
                    None => Ok(AppCommand::Unknown(
                        "用法: load <path> [--update]".to_string(),
                    )),
                }
            }
            "validate" | "check" => match parts.get(1) {
                Some(p) => Ok(AppCommand::Validate {
                    path: PathBuf::from(p),
                }),
                None => Ok(AppCommand::Unknown("用法: validate <path>".to_string())),
            },
            "courses" | "ls" => Ok(AppCommand::Courses),
            "outline" | "show" => match parts.get(1) {
                Some(course) => Ok(AppCommand::Outline {
                    course: course.to_string(),
                }),
                None => Ok(AppCommand::Unknown("用法: outline <course>".to_string())),
            },
            "resequence" | "reseq" => match parts.get(1) {
                Some(course) => Ok(AppCommand::Resequence {
                    course: course.to_string(),
                    module: parts.get(2).map(|s| s.to_string()),
                }),
                None => Ok(AppCommand::Unknown(
                    "用法: resequence <course> [module]".to_string(),
                )),
            },
            "reorder" => {
                // 逗号与空格分隔都接受
                let slugs: Vec<String> = parts
                    .iter()
                    .skip(2)
                    .flat_map(|p| p.split(','))
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect();
                match parts.get(1) {
                    Some(course) if !slugs.is_empty() => Ok(AppCommand::Reorder {
                        course: course.to_string(),
                        slugs,
                    }),
                    _ => Ok(AppCommand::Unknown(
                        "用法: reorder <course> <slug,slug,...>".to_string(),
                    )),
                }
            }
            "remove-module" | "rm-module" => match (parts.get(1), parts.get(2)) {
                (Some(course), Some(module)) => Ok(AppCommand::RemoveModule {
                    course: course.to_string(),
                    module: module.to_string(),
                }),
                _ => Ok(AppCommand::Unknown(
                    "用法: remove-module <course> <module>".to_string(),
                )),
            },
            "clone" => {
                let title = parts.get(3..).map(|t| t.join(" ")).unwrap_or_default();
                match (parts.get(1), parts.get(2)) {
                    (Some(source), Some(new_slug)) if !title.is_empty() => Ok(AppCommand::Clone {
                        source: source.to_string(),
                        new_slug: new_slug.to_string(),
                        title,
                    }),
                    _ => Ok(AppCommand::Unknown(
                        "用法: clone <source> <new-slug> <title...>".to_string(),
                    )),
                }
            }
            "fix-cert-tracks" | "fix-tracks" => Ok(AppCommand::FixCertTracks),
            "audit" => Ok(AppCommand::Audit),
            "stats" => Ok(AppCommand::Stats),
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}
