//! UI rendering for the quiz trainer.

use crate::app::{App, AskState, GeneratePhase, View, MENU_ITEMS};
use crate::models::QuestionBody;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.view {
        View::Menu => draw_menu(f, app),
        View::Generate => draw_generate(f, app),
        View::Practice => draw_practice(f, app),
        View::Test => draw_test(f, app),
        View::TestResult => draw_test_result(f, app),
        View::Stats => draw_stats(f, app),
        View::Manage => draw_manage(f, app),
    }

    if let Some(msg) = &app.message {
        draw_message(f, msg);
    }
}

fn frame_chunks(f: &Frame) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area())
}

fn header(f: &mut Frame, area: Rect, title: &str) {
    let header = Paragraph::new(title)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn footer(f: &mut Frame, area: Rect, text: &str) {
    let footer = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

fn draw_menu(f: &mut Frame, app: &App) {
    let chunks = frame_chunks(f);
    header(f, chunks[0], "Quiz Trainer");

    let items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == app.menu_index {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let key = if i == MENU_ITEMS.len() - 1 { 0 } else { i + 1 };
            ListItem::new(format!("  {key}. {item}")).style(style)
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Menu "));
    f.render_widget(list, chunks[1]);

    let mode = if app.llm.is_available() {
        "LLM backend configured"
    } else {
        "Offline mode: built-in generation and grading"
    };
    footer(
        f,
        chunks[2],
        &format!("j/k:Navigate  Enter:Select  1-5:Jump  q:Quit  |  {mode}"),
    );
}

fn draw_generate(f: &mut Frame, app: &App) {
    let chunks = frame_chunks(f);
    header(f, chunks[0], "Generate Questions");

    let Some(state) = &app.generate else { return };

    match state.phase {
        GeneratePhase::Topic => {
            draw_prompt(f, chunks[1], "Topic for new questions", &app.input_buffer);
            footer(f, chunks[2], "Enter:Continue  Esc:Cancel");
        }
        GeneratePhase::Count => {
            draw_prompt(
                f,
                chunks[1],
                &format!("How many questions about '{}'? [3]", state.topic),
                &app.input_buffer,
            );
            footer(f, chunks[2], "Enter:Generate  Esc:Cancel");
        }
        GeneratePhase::Review => {
            let Some(spec) = state.specs.get(state.current) else { return };

            let mut lines = vec![
                Line::from(format!(
                    "Question {}/{}",
                    state.current + 1,
                    state.specs.len()
                )),
                Line::from(format!("Type: {}", spec.question_type.name())),
                Line::from(""),
                Line::from(spec.text.as_str()),
                Line::from(""),
            ];
            for (idx, option) in spec.options.iter().enumerate() {
                let marker = if spec.correct_index == Some(idx) { "*" } else { " " };
                lines.push(Line::from(format!("  {}. {option} {marker}", idx + 1)));
            }
            if let Some(reference) = &spec.reference_answer {
                lines.push(Line::from(Span::styled(
                    format!("Reference: {reference}"),
                    Style::default().fg(Color::Green),
                )));
            }
            let preview = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title(" Review "))
                .wrap(Wrap { trim: true });
            f.render_widget(preview, chunks[1]);

            if state.edit.is_some() {
                draw_input_popup(f, "Edit (blank keeps current value)", &app.input_buffer);
            }
            footer(f, chunks[2], "a:Accept  s:Skip  e:Edit  q:Back to menu");
        }
    }
}

fn draw_practice(f: &mut Frame, app: &App) {
    let chunks = frame_chunks(f);
    header(f, chunks[0], "Practice");

    if let Some(ask) = &app.practice {
        draw_question(f, chunks[1], ask);
        let hint = if ask.feedback.is_some() {
            "Any key:Next question  q/Esc:Back to menu"
        } else if ask.question.is_multiple_choice() {
            "1-9:Answer  Esc:Back to menu"
        } else {
            "Type your answer, Enter:Submit  Esc:Back to menu"
        };
        footer(f, chunks[2], hint);
    }
}

fn draw_test(f: &mut Frame, app: &App) {
    let chunks = frame_chunks(f);
    header(f, chunks[0], "Test");

    match &app.test {
        None => {
            let active = app.manager.active_questions().len();
            draw_prompt(
                f,
                chunks[1],
                &format!("There are {active} active questions. How many in the test?"),
                &app.input_buffer,
            );
            footer(f, chunks[2], "Enter:Start  Esc:Cancel");
        }
        Some(test) => {
            let inner = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(0)])
                .split(chunks[1]);
            let total = test.index + 1 + test.questions.len();
            let progress = Paragraph::new(format!(
                "Question {} of {} | Correct so far: {}",
                test.index + 1,
                total,
                test.correct
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(progress, inner[0]);

            draw_question(f, inner[1], &test.ask);
            let hint = if test.ask.feedback.is_some() {
                "Any key:Next question"
            } else if test.ask.question.is_multiple_choice() {
                "1-9:Answer  Esc:Abandon test"
            } else {
                "Type your answer, Enter:Submit  Esc:Abandon test"
            };
            footer(f, chunks[2], hint);
        }
    }
}

fn draw_test_result(f: &mut Frame, app: &App) {
    let chunks = frame_chunks(f);
    header(f, chunks[0], "Test Complete");

    let (correct, total) = app
        .test
        .as_ref()
        .map(|t| (t.correct, app.test_total()))
        .unwrap_or((0, 0));
    let pct = if total > 0 {
        100.0 * correct as f64 / total as f64
    } else {
        0.0
    };
    let result = Paragraph::new(format!("Your score: {correct} / {total} ({pct:.0}%)"))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(result, chunks[1]);

    footer(f, chunks[2], "Any key:Back to menu");
}

fn draw_question(f: &mut Frame, area: Rect, ask: &AskState) {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("Topic: {}", ask.question.topic),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from(ask.question.text.as_str()),
        Line::from(""),
    ];

    match ask.question.body() {
        QuestionBody::MultipleChoice { options, .. } => {
            for (idx, option) in options.iter().enumerate() {
                lines.push(Line::from(format!("  {}. {option}", idx + 1)));
            }
        }
        QuestionBody::Freeform { .. } => {
            lines.push(Line::from(vec![
                Span::raw("Your answer: "),
                Span::styled(ask.answer_buffer.as_str(), Style::default().fg(Color::Yellow)),
            ]));
        }
    }

    if let Some(feedback) = &ask.feedback {
        let color = if feedback.correct { Color::Green } else { Color::Red };
        lines.push(Line::from(""));
        for part in feedback.text.lines() {
            lines.push(Line::from(Span::styled(
                part.to_string(),
                Style::default().fg(color),
            )));
        }
    }

    let question = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Question "))
        .wrap(Wrap { trim: true });
    f.render_widget(question, area);
}

fn draw_stats(f: &mut Frame, app: &App) {
    let chunks = frame_chunks(f);
    header(f, chunks[0], "Question Statistics");

    let rows: Vec<Row> = app
        .manager
        .questions()
        .iter()
        .map(|q| {
            let stats = q.stats();
            let accuracy = if stats.times_shown() > 0 {
                format!("{:.0}%", 100.0 * stats.accuracy())
            } else {
                "--".to_string()
            };
            Row::new(vec![
                crate::app::short_id(q.id),
                if q.active { "Y" } else { "N" }.to_string(),
                q.question_type().name().to_string(),
                q.topic.clone(),
                stats.times_shown().to_string(),
                stats.times_correct().to_string(),
                accuracy,
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Percentage(40),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(6),
        ],
    )
    .header(
        Row::new(vec!["ID", "Act", "Type", "Topic", "Shown", "Correct", "Acc"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(table, chunks[1]);

    footer(f, chunks[2], "q/Esc:Back");
}

fn draw_manage(f: &mut Frame, app: &App) {
    let chunks = frame_chunks(f);
    header(f, chunks[0], "Manage Questions");

    if app.manager.questions().is_empty() {
        let msg = Paragraph::new("No questions stored yet.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(msg, chunks[1]);
    } else {
        let items: Vec<ListItem> = app
            .manager
            .questions()
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let marker = if q.active { "[active]  " } else { "[inactive]" };
                let style = if i == app.manage_index {
                    Style::default().bg(Color::DarkGray)
                } else if q.active {
                    Style::default()
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                ListItem::new(format!(
                    "  {} {} {} - {}",
                    crate::app::short_id(q.id),
                    marker,
                    q.topic,
                    q.text
                ))
                .style(style)
            })
            .collect();
        let list =
            List::new(items).block(Block::default().borders(Borders::ALL).title(" Questions "));
        f.render_widget(list, chunks[1]);
    }

    footer(f, chunks[2], "j/k:Navigate  Space/Enter:Toggle active  q/Esc:Back");
}

fn draw_prompt(f: &mut Frame, area: Rect, label: &str, buffer: &str) {
    let lines = vec![
        Line::from(label.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            format!("> {buffer}"),
            Style::default().fg(Color::Yellow),
        )),
    ];
    let prompt = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(prompt, area);
}

fn draw_input_popup(f: &mut Frame, title: &str, buffer: &str) {
    let area = centered_rect(60, 15, f.area());
    f.render_widget(Clear, area);

    let input = Paragraph::new(buffer)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(format!(" {title} ")));
    f.render_widget(input, area);

    f.set_cursor_position((area.x + 1 + buffer.len() as u16, area.y + 1));
}

fn draw_message(f: &mut Frame, msg: &str) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(5),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
