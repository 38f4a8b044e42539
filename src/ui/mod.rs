use crate::app_state::{App, FocusArea, InputMode, ViewMode, MENU_ITEMS};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    // 创建布局
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏
            Constraint::Min(0),    // 中间内容区域
            Constraint::Min(8),    // 底部命令/日志区域
        ])
        .split(f.size());

    render_top_bar(f, chunks[0], app);

    // 中间内容区域（左侧菜单 + 主视图）
    let middle_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_left_menu(f, middle_chunks[0], app);
    render_main_view(f, middle_chunks[1], app);
    render_bottom_bar(f, chunks[2], app);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

/// 按行首符号着色，与日志面板一致
fn line_style(line: &str) -> Style {
    let trimmed = line.trim_start();
    if trimmed.starts_with('✓') {
        Style::default().fg(Color::Green)
    } else if trimmed.starts_with('✗') {
        Style::default().fg(Color::Red)
    } else if trimmed.starts_with('⚠') {
        Style::default().fg(Color::Yellow)
    } else if trimmed.starts_with("caused by") {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let stats = &app.stats;
    let title_text = Line::from(vec![
        Span::styled(
            " 课程目录 ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " 课程 {} | 模块 {} | 条目 {} | 课时 {} | 测验 {} | 实验 {} | 互动单元 {}",
            stats.courses,
            stats.modules,
            stats.links,
            stats.content.lessons,
            stats.content.quizzes,
            stats.content.labs,
            stats.content.units
        )),
    ]);

    let paragraph = Paragraph::new(title_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        )
        .alignment(ratatui::layout::Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let is_selected = i == app.menu_selected_index;
            let is_active = matches!(
                (i, &app.view_mode),
                (0, ViewMode::CourseList)
                    | (1, ViewMode::Outline)
                    | (2, ViewMode::LoadReport)
                    | (3, ViewMode::Audit)
            );

            let style = if is_selected {
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{}", prefix, text)).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "菜单 (Enter/c 确认)"
    } else {
        "菜单 (← 切换)"
    };

    let menu = List::new(menu_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(border_style(app.focus_area == FocusArea::Menu)),
    );

    f.render_widget(menu, area);
}

fn render_main_view(f: &mut Frame, area: Rect, app: &mut App) {
    let focused = app.focus_area == FocusArea::MainView;
    match app.view_mode {
        ViewMode::CourseList => {
            let items: Vec<ListItem> = app
                .course_list
                .iter()
                .map(|course| {
                    let (symbol, color) = if course.published {
                        ("●", Color::Green)
                    } else {
                        ("○", Color::Yellow)
                    };
                    let content = Line::from(vec![
                        Span::styled(format!("{} ", symbol), Style::default().fg(color)),
                        Span::styled(
                            format!("{:<28}", course.slug),
                            Style::default().fg(Color::Cyan),
                        ),
                        Span::styled(
                            format!(
                                "{:<11}",
                                course.certification_track.as_deref().unwrap_or("-")
                            ),
                            Style::default().fg(Color::Magenta),
                        ),
                        Span::raw(format!(
                            "{:>2} 模块 {:>3} 条目  ",
                            course.modules, course.items
                        )),
                        Span::raw(course.title.as_str()),
                    ]);
                    ListItem::new(content)
                })
                .collect();

            let published_filter = match app.filter_published {
                None => "全部",
                Some(true) => "已发布",
                Some(false) => "草稿",
            };
            let query_info = if app.filter_query.is_empty() {
                String::new()
            } else {
                format!(" 搜索: \"{}\"", app.filter_query)
            };
            let title = if focused {
                format!(
                    "课程列表 [{}]{} (f 切换, Enter/c 大纲, ← 菜单)",
                    published_filter, query_info
                )
            } else {
                format!("课程列表 [{}]{}", published_filter, query_info)
            };

            let list = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(title)
                        .style(border_style(focused)),
                )
                .highlight_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol(">> ");
            app.course_list_state.select(Some(app.selected_index));
            f.render_stateful_widget(list, area, &mut app.course_list_state);
        }
        ViewMode::Outline => {
            let lines: Vec<Line> = match &app.outline {
                Some(outline) => outline
                    .lines()
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| {
                        let style = if i == 0 {
                            Style::default()
                                .fg(Color::Yellow)
                                .add_modifier(Modifier::BOLD)
                        } else if text.contains("<missing>") {
                            Style::default().fg(Color::Red)
                        } else if !text.starts_with("       ") {
                            Style::default().fg(Color::Cyan)
                        } else {
                            Style::default().fg(Color::White)
                        };
                        Line::from(Span::styled(text, style))
                    })
                    .collect(),
                None => vec![Line::from("在课程列表按 Enter，或输入 `outline <course>`")],
            };
            render_scrolled(f, area, lines, "课程大纲 (↑↓ 滚动, x 返回)", "课程大纲", app);
        }
        ViewMode::LoadReport => {
            let lines: Vec<Line> = match &app.load_report {
                Some(report) => report
                    .lines()
                    .into_iter()
                    .map(|text| {
                        let style = line_style(&text);
                        Line::from(Span::styled(text, style))
                    })
                    .collect(),
                None => vec![Line::from("暂无加载记录，输入 `load <path>` 开始")],
            };
            render_scrolled(f, area, lines, "加载报告 (↑↓ 滚动, x 返回)", "加载报告", app);
        }
        ViewMode::Audit => {
            let lines: Vec<Line> = match &app.audit {
                Some(audit) => audit
                    .lines()
                    .into_iter()
                    .map(|text| {
                        let style = line_style(&text);
                        Line::from(Span::styled(text, style))
                    })
                    .collect(),
                None => vec![Line::from("正在检查...")],
            };
            render_scrolled(
                f,
                area,
                lines,
                "一致性检查 (↑↓ 滚动, x 返回)",
                "一致性检查",
                app,
            );
        }
    }
}

fn render_scrolled(
    f: &mut Frame,
    area: Rect,
    lines: Vec<Line>,
    focused_title: &str,
    title: &str,
    app: &App,
) {
    let focused = app.focus_area == FocusArea::MainView;
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(if focused { focused_title } else { title })
                .style(border_style(focused)),
        )
        .scroll((app.detail_scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    // 命令输入区域
    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "命令: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        let cur = app.command_cursor.min(app.command_input.len());
        let (left, right) = app.command_input.split_at(cur);
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));

        // 如果有建议，添加浅灰色幽灵文本
        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }

        vec![
            Line::from(spans),
            Line::from("Enter执行 Esc取消 Tab补全 ←→光标 Home/End ↑历史 ↓下一条"),
        ]
    } else {
        vec![
            Line::from(vec![
                Span::styled("命令: ", Style::default().fg(Color::Yellow)),
                Span::raw("(按 / 进入命令模式, help 查看命令)"),
            ]),
            Line::from("/命令 f筛选 ←→切换 ↑↓导航 Enter/c确认 x返回 q退出"),
        ]
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if app.input_mode == InputMode::Command {
                "命令输入模式"
            } else {
                "命令输入"
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 日志区域：最新的在顶部，最多 20 条
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| ListItem::new(msg.as_str()).style(line_style(msg)))
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
