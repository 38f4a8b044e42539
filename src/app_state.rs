use crate::catalog::maintenance::{AuditReport, CatalogStats, CourseOutline};
use crate::commands::AppCommand;
use crate::seed::LoadReport;
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use std::str::FromStr;
use tokio::sync::mpsc;

#[derive(PartialEq, Debug, Clone)]
pub enum ViewMode {
    CourseList,
    Outline,
    LoadReport,
    Audit,
}

pub const MENU_ITEMS: [&str; 4] = ["课程列表", "课程大纲", "加载报告", "一致性检查"];

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,     // 焦点在左侧菜单
    MainView, // 焦点在主视图
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseSummary {
    pub slug: String,
    pub title: String,
    pub published: bool,
    pub certification_track: Option<String>,
    pub modules: usize,
    pub items: usize,
}

impl CourseSummary {
    pub fn line(&self) -> String {
        format!(
            "{} {:<28} {:<9} {:>2} modules {:>3} items  {}",
            if self.published { "●" } else { "○" },
            self.slug,
            self.certification_track.as_deref().unwrap_or("-"),
            self.modules,
            self.items,
            self.title
        )
    }
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Warn(String),
    Error(String),
    Courses(Vec<CourseSummary>),
    Stats(CatalogStats),
    Outline(CourseOutline),
    Report(LoadReport),
    Audit(AuditReport),
}

impl AppEvent {
    /// Plain-text rendering used by the headless runner.
    pub fn lines(&self) -> Vec<String> {
        match self {
            AppEvent::Log(m) | AppEvent::Message(m) | AppEvent::Warn(m) | AppEvent::Error(m) => {
                vec![m.clone()]
            }
            AppEvent::Courses(list) if list.is_empty() => vec!["(no courses)".to_string()],
            AppEvent::Courses(list) => list.iter().map(|c| c.line()).collect(),
            AppEvent::Stats(stats) => stats.lines(),
            AppEvent::Outline(outline) => outline.lines(),
            AppEvent::Report(report) => report.lines(),
            AppEvent::Audit(audit) => audit.lines(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AppEvent::Error(_))
    }
}

pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub courses_all: Vec<CourseSummary>,
    pub course_list: Vec<CourseSummary>,
    pub selected_index: usize,
    pub course_list_state: ListState,
    pub outline: Option<CourseOutline>,
    pub load_report: Option<LoadReport>,
    pub audit: Option<AuditReport>,
    pub stats: CatalogStats,
    pub detail_scroll: u16,
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub filter_published: Option<bool>,
    pub filter_query: String,
    pub log_messages: Vec<String>,
    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
}

impl App {
    pub fn new(session_info: Vec<String>, cmd_tx: mpsc::UnboundedSender<AppCommand>) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(session_info);

        App {
            view_mode: ViewMode::CourseList,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_selected_index: 0,
            courses_all: Vec::new(),
            course_list: Vec::new(),
            selected_index: 0,
            course_list_state: {
                let mut s = ListState::default();
                s.select(Some(0));
                s
            },
            outline: None,
            load_report: None,
            audit: None,
            stats: CatalogStats::default(),
            detail_scroll: 0,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            filter_published: None,
            filter_query: String::new(),
            log_messages,
            cmd_tx,
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) | AppEvent::Message(msg) | AppEvent::Warn(msg) | AppEvent::Error(msg) => {
                self.add_log(msg)
            }
            AppEvent::Courses(list) => {
                self.courses_all = list;
                self.apply_filters();
                self.clamp_selection();
            }
            AppEvent::Stats(stats) => {
                self.stats = stats;
            }
            AppEvent::Outline(outline) => {
                self.outline = Some(outline);
                self.detail_scroll = 0;
                self.show(ViewMode::Outline);
            }
            AppEvent::Report(report) => {
                self.add_log(format!(
                    "加载完成: {} 通过, {} 失败",
                    report.passed(),
                    report.failed()
                ));
                self.load_report = Some(report);
                self.detail_scroll = 0;
                self.show(ViewMode::LoadReport);
            }
            AppEvent::Audit(audit) => {
                self.audit = Some(audit);
                self.detail_scroll = 0;
                self.show(ViewMode::Audit);
            }
        }
    }

    fn show(&mut self, view: ViewMode) {
        self.menu_selected_index = match view {
            ViewMode::CourseList => 0,
            ViewMode::Outline => 1,
            ViewMode::LoadReport => 2,
            ViewMode::Audit => 3,
        };
        self.view_mode = view;
    }

    /// 获取当前的预测建议
    pub fn get_completion_hint(&self) -> Option<String> {
        let commands = [
            "load",
            "validate",
            "courses",
            "outline",
            "resequence",
            "reorder",
            "remove-module",
            "clone",
            "fix-cert-tracks",
            "audit",
            "stats",
            "help",
            "quit",
        ];
        let input = self.command_input.trim_start();
        if input.trim().is_empty() {
            return None;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let typing_new_word = input.ends_with(' ');
        if parts.len() == 1 && !typing_new_word {
            return commands
                .iter()
                .find(|cmd| cmd.starts_with(parts[0]) && **cmd != parts[0])
                .map(|cmd| cmd[parts[0].len()..].to_string());
        }

        // 第二个参数补全课程 slug
        let takes_course = matches!(
            parts[0],
            "outline" | "resequence" | "reorder" | "remove-module" | "clone"
        );
        if !takes_course || parts.len() != 2 || typing_new_word {
            return None;
        }
        let cur = parts[1];
        self.courses_all
            .iter()
            .map(|c| c.slug.as_str())
            .find(|slug| slug.starts_with(cur) && *slug != cur)
            .map(|slug| slug[cur.len()..].to_string())
    }

    pub fn clamp_selection(&mut self) {
        if self.selected_index >= self.course_list.len() {
            self.selected_index = self.course_list.len().saturating_sub(1);
        }
        self.course_list_state.select(Some(self.selected_index));
    }

    pub fn apply_filters(&mut self) {
        let query = self.filter_query.to_lowercase();
        let mut filtered: Vec<CourseSummary> = self
            .courses_all
            .iter()
            .filter(|c| {
                if let Some(published) = self.filter_published {
                    if c.published != published {
                        return false;
                    }
                }
                if !query.is_empty()
                    && !c.slug.contains(&query)
                    && !c.title.to_lowercase().contains(&query)
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        filtered.sort_by(|a, b| a.slug.cmp(&b.slug));

        self.course_list = filtered;
        if self.selected_index >= self.course_list.len() {
            self.selected_index = 0;
        }
        self.course_list_state.select(Some(self.selected_index));
    }

    pub fn selected_course(&self) -> Option<&CourseSummary> {
        self.course_list.get(self.selected_index)
    }

    /// 请求选中课程的大纲
    pub fn request_outline(&mut self) {
        if let Some(course) = self.selected_course() {
            let _ = self.cmd_tx.send(AppCommand::Outline {
                course: course.slug.clone(),
            });
        }
    }

    fn finish_command(&mut self, cmd_owned: String) {
        self.command_history.push(cmd_owned);
        self.command_history_index = None;
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    /// Local filter command; never reaches the background task.
    fn apply_filter_command(&mut self, args: &str) {
        if args.is_empty() || args == "clear" || args == "--clear" {
            self.filter_query.clear();
            self.filter_published = None;
        } else {
            let mut query_parts: Vec<&str> = Vec::new();
            for tok in args.split_whitespace() {
                match tok.to_ascii_lowercase().as_str() {
                    "--published" | "published" => self.filter_published = Some(true),
                    "--draft" | "draft" => self.filter_published = Some(false),
                    _ => query_parts.push(tok),
                }
            }
            self.filter_query = query_parts.join(" ");
        }
        self.apply_filters();
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        if self.input_mode == InputMode::Command {
            match key {
                KeyCode::Enter => {
                    let cmd_owned = self.command_input.trim().to_string();
                    if cmd_owned.is_empty() || cmd_owned == "q" {
                        self.command_input.clear();
                        self.command_cursor = 0;
                        self.input_mode = InputMode::Normal;
                        return false;
                    }

                    if let Some(rest) = cmd_owned.strip_prefix("filter") {
                        let args = rest.trim().to_string();
                        self.apply_filter_command(&args);
                        self.finish_command(cmd_owned);
                        return false;
                    }

                    let app_cmd = AppCommand::from_str(&cmd_owned)
                        .unwrap_or_else(|_| AppCommand::Unknown(cmd_owned.clone()));
                    let quit = app_cmd == AppCommand::Quit;
                    let _ = self.cmd_tx.send(app_cmd);
                    self.finish_command(cmd_owned);
                    return quit;
                }
                KeyCode::Esc => {
                    self.command_input.clear();
                    self.command_cursor = 0;
                    self.input_mode = InputMode::Normal;
                    return false;
                }
                KeyCode::Tab => {
                    if let Some(hint) = self.get_completion_hint() {
                        let insert = format!("{} ", hint);
                        self.command_input.insert_str(self.command_cursor, &insert);
                        self.command_cursor += insert.len();
                    }
                    return false;
                }
                KeyCode::Up => {
                    if self.command_history.is_empty() {
                        return false;
                    }
                    let next = match self.command_history_index {
                        None => self.command_history.len().saturating_sub(1),
                        Some(i) => i.saturating_sub(1),
                    };
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                    return false;
                }
                KeyCode::Down => {
                    let next = match self.command_history_index {
                        None => return false,
                        Some(i) => i + 1,
                    };
                    if next >= self.command_history.len() {
                        self.command_history_index = None;
                        self.command_input.clear();
                        self.command_cursor = 0;
                        return false;
                    }
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                    return false;
                }
                KeyCode::Backspace => {
                    if self.command_cursor > 0 {
                        if let Some((idx, _)) =
                            self.command_input[..self.command_cursor].char_indices().last()
                        {
                            self.command_input.remove(idx);
                            self.command_cursor = idx;
                        }
                    }
                    return false;
                }
                KeyCode::Delete => {
                    if self.command_cursor < self.command_input.len() {
                        self.command_input.remove(self.command_cursor);
                    }
                    return false;
                }
                KeyCode::Left => {
                    if let Some((idx, _)) =
                        self.command_input[..self.command_cursor].char_indices().last()
                    {
                        self.command_cursor = idx;
                    }
                    return false;
                }
                KeyCode::Right => {
                    if let Some(c) = self.command_input[self.command_cursor..].chars().next() {
                        self.command_cursor += c.len_utf8();
                    }
                    return false;
                }
                KeyCode::Home => {
                    self.command_cursor = 0;
                    return false;
                }
                KeyCode::End => {
                    self.command_cursor = self.command_input.len();
                    return false;
                }
                KeyCode::Char(c) => {
                    self.command_input.insert(self.command_cursor, c);
                    self.command_cursor += c.len_utf8();
                    return false;
                }
                _ => return false,
            }
        }

        // 正常模式下的按键处理
        match key {
            KeyCode::Char('/') | KeyCode::Char(':') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
                false
            }
            KeyCode::Char('q') => true,
            KeyCode::Left => {
                self.focus_area = FocusArea::Menu;
                false
            }
            KeyCode::Right => {
                self.focus_area = FocusArea::MainView;
                false
            }
            KeyCode::Up => {
                if self.focus_area == FocusArea::Menu {
                    self.menu_selected_index = self.menu_selected_index.saturating_sub(1);
                } else if self.view_mode == ViewMode::CourseList {
                    self.selected_index = self.selected_index.saturating_sub(1);
                    self.course_list_state.select(Some(self.selected_index));
                } else {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                }
                false
            }
            KeyCode::Down => {
                if self.focus_area == FocusArea::Menu {
                    if self.menu_selected_index < MENU_ITEMS.len() - 1 {
                        self.menu_selected_index += 1;
                    }
                } else if self.view_mode == ViewMode::CourseList {
                    if self.selected_index < self.course_list.len().saturating_sub(1) {
                        self.selected_index += 1;
                    }
                    self.course_list_state.select(Some(self.selected_index));
                } else {
                    self.detail_scroll = self.detail_scroll.saturating_add(1);
                }
                false
            }
            KeyCode::Enter | KeyCode::Char('c') => {
                if self.focus_area == FocusArea::Menu {
                    match self.menu_selected_index {
                        0 => self.view_mode = ViewMode::CourseList,
                        1 => {
                            self.view_mode = ViewMode::Outline;
                            if self.outline.is_none() {
                                self.request_outline();
                            }
                        }
                        2 => self.view_mode = ViewMode::LoadReport,
                        3 => {
                            self.view_mode = ViewMode::Audit;
                            let _ = self.cmd_tx.send(AppCommand::Audit);
                        }
                        _ => {}
                    }
                    self.focus_area = FocusArea::MainView;
                } else if self.view_mode == ViewMode::CourseList && !self.course_list.is_empty() {
                    // 在课程列表按 Enter 直接打开大纲
                    self.request_outline();
                }
                false
            }
            KeyCode::Char('x') => {
                if self.focus_area == FocusArea::MainView && self.view_mode != ViewMode::CourseList
                {
                    self.show(ViewMode::CourseList);
                }
                false
            }
            KeyCode::Char('f') => {
                if self.view_mode == ViewMode::CourseList {
                    self.filter_published = match self.filter_published {
                        None => Some(true),
                        Some(true) => Some(false),
                        Some(false) => None,
                    };
                    self.apply_filters();
                }
                false
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(slug: &str, published: bool) -> CourseSummary {
        CourseSummary {
            slug: slug.to_string(),
            title: slug.replace('-', " "),
            published,
            certification_track: None,
            modules: 2,
            items: 5,
        }
    }

    fn app() -> (App, mpsc::UnboundedReceiver<AppCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let mut app = App::new(vec![], cmd_tx);
        app.handle_event(AppEvent::Courses(vec![
            summary("kubernetes-basics", false),
            summary("docker-fundamentals", true),
        ]));
        (app, cmd_rx)
    }

    fn type_command(app: &mut App, text: &str) -> bool {
        app.handle_key_event(KeyCode::Char('/'));
        for c in text.chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
        app.handle_key_event(KeyCode::Enter)
    }

    #[test]
    fn courses_are_sorted_and_filtered() {
        let (mut app, _rx) = app();
        assert_eq!(app.course_list[0].slug, "docker-fundamentals");

        app.handle_key_event(KeyCode::Char('f'));
        assert_eq!(app.course_list.len(), 1);
        app.handle_key_event(KeyCode::Char('f'));
        assert_eq!(app.course_list[0].slug, "kubernetes-basics");
        app.handle_key_event(KeyCode::Char('f'));
        assert_eq!(app.course_list.len(), 2);

        type_command(&mut app, "filter kube");
        assert_eq!(app.course_list.len(), 1);
        type_command(&mut app, "filter clear");
        assert_eq!(app.course_list.len(), 2);
    }

    #[test]
    fn commands_are_sent_and_remembered() {
        let (mut app, mut rx) = app();
        assert!(!type_command(&mut app, "outline docker-fundamentals"));
        assert_eq!(
            rx.try_recv().unwrap(),
            AppCommand::Outline {
                course: "docker-fundamentals".to_string()
            }
        );
        assert!(type_command(&mut app, "quit"));
        assert_eq!(app.command_history.len(), 2);

        app.handle_key_event(KeyCode::Char('/'));
        app.handle_key_event(KeyCode::Up);
        app.handle_key_event(KeyCode::Up);
        assert_eq!(app.command_input, "outline docker-fundamentals");
        app.handle_key_event(KeyCode::Down);
        app.handle_key_event(KeyCode::Down);
        assert!(app.command_input.is_empty());
    }

    #[test]
    fn completes_commands_and_course_slugs() {
        let (mut app, _rx) = app();
        app.command_input = "reo".to_string();
        assert_eq!(app.get_completion_hint().as_deref(), Some("rder"));
        app.command_input = "outline dock".to_string();
        assert_eq!(app.get_completion_hint().as_deref(), Some("er-fundamentals"));
        app.command_input = "audit x".to_string();
        assert_eq!(app.get_completion_hint(), None);
    }

    #[test]
    fn enter_on_course_requests_outline() {
        let (mut app, mut rx) = app();
        app.handle_key_event(KeyCode::Right);
        app.handle_key_event(KeyCode::Down);
        app.handle_key_event(KeyCode::Enter);
        assert_eq!(
            rx.try_recv().unwrap(),
            AppCommand::Outline {
                course: "kubernetes-basics".to_string()
            }
        );
    }

    #[test]
    fn report_event_switches_view() {
        let (mut app, _rx) = app();
        app.handle_event(AppEvent::Report(LoadReport::default()));
        assert_eq!(app.view_mode, ViewMode::LoadReport);
        assert_eq!(app.menu_selected_index, 2);
        assert!(app.log_messages.last().unwrap().contains("0 通过"));
        app.handle_key_event(KeyCode::Right);
        app.handle_key_event(KeyCode::Char('x'));
        assert_eq!(app.view_mode, ViewMode::CourseList);
    }
}
