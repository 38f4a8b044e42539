mod app_service;
mod app_state;
mod catalog;
mod commands;
mod config;
mod seed;
mod storage;
mod ui;

use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use sea_orm::DatabaseConnection;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app_service::refresh_ui;
use crate::app_state::{App, AppEvent};
use crate::commands::AppCommand;
use crate::config::AppConfig;
use crate::ui::draw;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> io::Result<()> {
    let config = AppConfig::from_env();

    // 带参数时作为一次性命令运行，不进入 TUI
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        init_logging(env_logger::Target::Stderr);
        let ok = run_headless(&config, &args.join(" ")).await;
        std::process::exit(if ok { 0 } else { 1 });
    }

    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    std::fs::create_dir_all(&config.log_dir)?;
    let log_file = std::fs::File::create(log_path(&config.log_dir, &ts))?;
    init_logging(env_logger::Target::Pipe(Box::new(log_file)));

    let mut session_info = config.session_info();
    session_info.push("正在初始化数据库...".to_string());
    let db = match connect(&config).await {
        Ok(connection) => {
            session_info.push("✓ 数据库连接成功".to_string());
            Arc::new(connection)
        }
        Err(e) => {
            eprintln!("无法连接数据库: {}", e);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("数据库连接失败: {}", e),
            ));
        }
    };

    // 创建核心 Channel
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 单后台任务：命令按收到的顺序逐条执行
    let db_bg = Arc::clone(&db);
    let evt_tx_bg = evt_tx.clone();
    tokio::spawn(async move {
        refresh_ui(&db_bg, &evt_tx_bg).await;

        while let Some(cmd) = cmd_rx.recv().await {
            if cmd == AppCommand::Quit {
                break;
            }
            let refresh = cmd.mutates();
            commands::dispatch(cmd, &db_bg, &evt_tx_bg).await;
            if refresh {
                refresh_ui(&db_bg, &evt_tx_bg).await;
            }
        }
    });

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session_info, cmd_tx);
    let res = run_app_loop(&mut terminal, &mut app, evt_rx).await;

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn init_logging(target: env_logger::Target) {
    env_logger::Builder::from_default_env()
        .target(target)
        .filter_level(log::LevelFilter::Warn)
        .filter_module("courseseed", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .init();
}

fn log_path(dir: &Path, ts: &str) -> std::path::PathBuf {
    dir.join(format!("courseseed-{}.log", ts))
}

async fn connect(config: &AppConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    storage::establish_connection_with(&config.database_url, config.max_connections).await
}

/// 执行单条命令并把事件输出到终端。失败或出现错误事件时返回 false。
async fn run_headless(config: &AppConfig, line: &str) -> bool {
    let db = match connect(config).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("✗ 数据库连接失败 ({}): {}", config.database_url, e);
            return false;
        }
    };

    let cmd = AppCommand::from_str(line).unwrap_or_else(|_| AppCommand::Unknown(line.to_string()));
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();
    let ok = commands::dispatch(cmd, &db, &evt_tx).await;
    drop(evt_tx);

    let mut saw_error = false;
    while let Some(evt) = evt_rx.recv().await {
        saw_error |= evt.is_error();
        let to_stderr = matches!(evt, AppEvent::Error(_) | AppEvent::Warn(_));
        for line in evt.lines() {
            if to_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        }
    }
    ok && !saw_error
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.handle_event(event);
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key_event(key.code) {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_named_after_the_binary() {
        assert_eq!(
            log_path(Path::new("logs"), "20260101-120000"),
            Path::new("logs").join("courseseed-20260101-120000.log")
        );
    }

    #[tokio::test]
    async fn headless_reports_failure() {
        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("sqlite::memory:".to_string()),
            _ => None,
        });
        assert!(run_headless(&config, "stats").await);
        assert!(!run_headless(&config, "outline missing-course").await);
        assert!(!run_headless(&config, "frobnicate").await);
    }
}
