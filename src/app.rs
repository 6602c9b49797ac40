//! Application state and logic.

use crate::config::Config;
use crate::llm::{GeneratedQuestion, LlmClient};
use crate::models::{Question, QuestionBody};
use crate::quiz::QuizManager;
use crate::selection::strategy_by_name;
use crate::storage::JsonFileStore;
use crossterm::event::{KeyCode, KeyEvent};
use std::io::Write as _;
use tracing::{error, info, warn};

pub struct App {
    pub manager: QuizManager,
    pub llm: LlmClient,
    pub config: Config,
    pub view: View,
    pub menu_index: usize,
    pub input_buffer: String,
    pub message: Option<String>,
    pub should_quit: bool,
    pub generate: Option<GenerateState>,
    pub practice: Option<AskState>,
    pub test: Option<TestState>,
    pub manage_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Menu,
    Generate,
    Practice,
    Test,
    TestResult,
    Stats,
    Manage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratePhase {
    Topic,
    Count,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Text,
    Reference,
}

/// State for the generate-and-review flow.
pub struct GenerateState {
    pub phase: GeneratePhase,
    pub topic: String,
    pub specs: Vec<GeneratedQuestion>,
    pub current: usize,
    pub edit: Option<EditField>,
}

/// One question being asked, in practice or test mode.
pub struct AskState {
    pub question: Question,
    pub answer_buffer: String,
    pub feedback: Option<Feedback>,
}

impl AskState {
    fn new(question: Question) -> Self {
        Self {
            question,
            answer_buffer: String::new(),
            feedback: None,
        }
    }
}

pub struct Feedback {
    pub correct: bool,
    pub text: String,
}

/// A running fixed-size test.
pub struct TestState {
    pub questions: Vec<Question>,
    pub index: usize,
    pub correct: usize,
    pub ask: AskState,
}

pub const MENU_ITEMS: [&str; 6] = [
    "Generate questions",
    "Practice mode",
    "Test mode",
    "View statistics",
    "Manage questions",
    "Quit",
];

impl App {
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::load();
        let store = JsonFileStore::new(config.questions_path());
        let strategy = strategy_by_name(&config.selection.strategy);
        let manager = QuizManager::new(Box::new(store), strategy)?;
        let llm = LlmClient::new(&config.llm, config.resolve_api_key())?;
        info!(questions = manager.questions().len(), "loaded question collection");

        Ok(Self {
            manager,
            llm,
            config,
            view: View::Menu,
            menu_index: 0,
            input_buffer: String::new(),
            message: None,
            should_quit: false,
            generate: None,
            practice: None,
            test: None,
            manage_index: 0,
        })
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.message = None;

        match self.view {
            View::Menu => self.handle_menu_key(key),
            View::Generate => self.handle_generate_key(key),
            View::Practice => self.handle_practice_key(key),
            View::Test => self.handle_test_key(key),
            View::TestResult => self.handle_test_result_key(key),
            View::Stats => self.handle_stats_key(key),
            View::Manage => self.handle_manage_key(key),
        }
    }

    fn back_to_menu(&mut self) {
        self.view = View::Menu;
        self.generate = None;
        self.practice = None;
        self.test = None;
        self.input_buffer.clear();
    }

    // --- main menu -----------------------------------------------------

    fn handle_menu_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.menu_index = (self.menu_index + 1).min(MENU_ITEMS.len() - 1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.menu_index = self.menu_index.saturating_sub(1);
            }
            KeyCode::Enter => self.activate_menu_item(self.menu_index),
            KeyCode::Char(c @ '1'..='5') => {
                self.activate_menu_item(c as usize - '1' as usize);
            }
            KeyCode::Char('q') | KeyCode::Char('0') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn activate_menu_item(&mut self, index: usize) {
        self.menu_index = index;
        match index {
            0 => {
                self.generate = Some(GenerateState {
                    phase: GeneratePhase::Topic,
                    topic: String::new(),
                    specs: Vec::new(),
                    current: 0,
                    edit: None,
                });
                self.input_buffer.clear();
                self.view = View::Generate;
            }
            1 => self.start_practice(),
            2 => {
                if self.manager.active_questions().is_empty() {
                    self.message = Some("There are no active questions available for testing.".into());
                    return;
                }
                self.input_buffer.clear();
                self.view = View::Test;
            }
            3 => self.view = View::Stats,
            4 => {
                self.manage_index = 0;
                self.view = View::Manage;
            }
            5 => self.should_quit = true,
            _ => {}
        }
    }

    // --- question generation -------------------------------------------

    fn handle_generate_key(&mut self, key: KeyEvent) {
        let Some(state) = &mut self.generate else {
            self.back_to_menu();
            return;
        };

        if state.edit.is_some() {
            self.handle_generate_edit_key(key);
            return;
        }

        match state.phase {
            GeneratePhase::Topic => match key.code {
                KeyCode::Esc => {
                    self.message = Some("Cancelled.".into());
                    self.back_to_menu();
                }
                KeyCode::Enter => {
                    let topic = self.input_buffer.trim().to_string();
                    if topic.is_empty() {
                        self.message = Some("Cancelled.".into());
                        self.back_to_menu();
                        return;
                    }
                    state.topic = topic;
                    state.phase = GeneratePhase::Count;
                    self.input_buffer.clear();
                }
                KeyCode::Backspace => {
                    self.input_buffer.pop();
                }
                KeyCode::Char(c) => self.input_buffer.push(c),
                _ => {}
            },
            GeneratePhase::Count => match key.code {
                KeyCode::Esc => self.back_to_menu(),
                KeyCode::Enter => self.run_generation(),
                KeyCode::Backspace => {
                    self.input_buffer.pop();
                }
                KeyCode::Char(c) if c.is_ascii_digit() => self.input_buffer.push(c),
                _ => {}
            },
            GeneratePhase::Review => match key.code {
                KeyCode::Char('a') => self.accept_current_spec(),
                KeyCode::Char('s') => self.advance_review(),
                KeyCode::Char('e') => {
                    let spec = &state.specs[state.current];
                    self.input_buffer = spec.text.clone();
                    state.edit = Some(EditField::Text);
                }
                KeyCode::Char('q') | KeyCode::Esc => self.back_to_menu(),
                _ => {}
            },
        }
    }

    fn run_generation(&mut self) {
        let Some(state) = &mut self.generate else { return };
        let count = match self.input_buffer.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ if self.input_buffer.trim().is_empty() => 3,
            _ => {
                self.message = Some("Invalid number, using 3 questions.".into());
                3
            }
        };
        self.input_buffer.clear();

        let topic = state.topic.clone();
        match self.llm.generate_questions(&topic, count) {
            Ok(specs) => {
                let Some(state) = &mut self.generate else { return };
                state.specs = specs;
                state.current = 0;
                state.phase = GeneratePhase::Review;
            }
            Err(err) => {
                warn!(%err, "question generation failed");
                self.message = Some(format!("Could not generate questions: {err}"));
                self.back_to_menu();
            }
        }
    }

    fn handle_generate_edit_key(&mut self, key: KeyEvent) {
        let Some(state) = &mut self.generate else { return };
        let Some(field) = state.edit else { return };

        match key.code {
            KeyCode::Esc => {
                state.edit = None;
                self.input_buffer.clear();
            }
            KeyCode::Enter => {
                let value = self.input_buffer.trim().to_string();
                let spec = &mut state.specs[state.current];
                match field {
                    EditField::Text => {
                        // Blank keeps the current value.
                        if !value.is_empty() {
                            spec.text = value;
                        }
                        if spec.reference_answer.is_some() {
                            self.input_buffer = spec.reference_answer.clone().unwrap_or_default();
                            state.edit = Some(EditField::Reference);
                            return;
                        }
                        state.edit = None;
                        self.input_buffer.clear();
                    }
                    EditField::Reference => {
                        if !value.is_empty() {
                            spec.reference_answer = Some(value);
                        }
                        state.edit = None;
                        self.input_buffer.clear();
                    }
                }
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn accept_current_spec(&mut self) {
        let Some(state) = &self.generate else { return };
        let spec = state.specs[state.current].clone();
        let topic = state.topic.clone();

        match spec.into_question(&topic) {
            Ok(question) => {
                let id = question.id;
                match self.manager.add_question(question) {
                    Ok(()) => {
                        self.message = Some(format!("Saved question {}", short_id(id)));
                        self.advance_review();
                    }
                    Err(err) => {
                        error!(%err, "failed to persist new question");
                        self.message = Some(format!("Save failed: {err}"));
                    }
                }
            }
            Err(err) => {
                self.message = Some(format!("Cannot accept question: {err}"));
                self.advance_review();
            }
        }
    }

    fn advance_review(&mut self) {
        let Some(state) = &mut self.generate else { return };
        state.current += 1;
        if state.current >= state.specs.len() {
            self.message = Some("Review finished.".into());
            self.back_to_menu();
        }
    }

    // --- practice mode --------------------------------------------------

    fn start_practice(&mut self) {
        match self.manager.select_for_practice() {
            Ok(question) => {
                self.practice = Some(AskState::new(question));
                self.view = View::Practice;
            }
            Err(err) => {
                self.message = Some(err.to_string());
                self.back_to_menu();
            }
        }
    }

    fn handle_practice_key(&mut self, key: KeyEvent) {
        let Some(ask) = &mut self.practice else {
            self.back_to_menu();
            return;
        };

        if ask.feedback.is_some() {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.back_to_menu(),
                _ => self.start_practice(),
            }
            return;
        }

        if matches!(key.code, KeyCode::Esc) {
            self.back_to_menu();
            return;
        }
        if let Some((correct, text)) = Self::answer_key_outcome(ask, key, &self.llm) {
            let id = ask.question.id;
            ask.feedback = Some(Feedback { correct, text });
            self.record(id, correct);
        }
    }

    // --- test mode -------------------------------------------------------

    fn handle_test_key(&mut self, key: KeyEvent) {
        if self.test.is_none() {
            self.handle_test_count_key(key);
            return;
        }

        let Some(test) = &mut self.test else { return };
        if test.ask.feedback.is_some() {
            self.advance_test();
            return;
        }

        if matches!(key.code, KeyCode::Esc) {
            self.message = Some("Test abandoned.".into());
            self.back_to_menu();
            return;
        }
        if let Some((correct, text)) = Self::answer_key_outcome(&mut test.ask, key, &self.llm) {
            let id = test.ask.question.id;
            test.ask.feedback = Some(Feedback { correct, text });
            if correct {
                test.correct += 1;
            }
            self.record(id, correct);
        }
    }

    fn handle_test_count_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.back_to_menu(),
            KeyCode::Enter => {
                let Ok(count) = self.input_buffer.trim().parse::<usize>() else {
                    self.message = Some("Invalid number; cancelling test.".into());
                    self.back_to_menu();
                    return;
                };
                self.input_buffer.clear();
                match self.manager.select_for_test(count) {
                    Ok(mut questions) => {
                        let first = questions.remove(0);
                        self.test = Some(TestState {
                            questions,
                            index: 0,
                            correct: 0,
                            ask: AskState::new(first),
                        });
                    }
                    Err(err) => {
                        self.message = Some(err.to_string());
                        self.back_to_menu();
                    }
                }
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn advance_test(&mut self) {
        let Some(test) = &mut self.test else { return };
        if test.questions.is_empty() {
            self.finish_test();
            return;
        }
        let next = test.questions.remove(0);
        test.index += 1;
        test.ask = AskState::new(next);
    }

    fn finish_test(&mut self) {
        let Some(test) = &self.test else { return };
        let total = test.index + 1;
        let correct = test.correct;
        self.view = View::TestResult;

        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S");
        let line = format!("{timestamp} - score: {correct}/{total}\n");
        if let Err(err) = append_line(&self.config.results_path(), &line) {
            warn!(%err, "failed to append to results file");
        }
    }

    fn handle_test_result_key(&mut self, _key: KeyEvent) {
        self.back_to_menu();
    }

    /// Total questions in the finished test, for the score screen.
    pub fn test_total(&self) -> usize {
        self.test.as_ref().map(|t| t.index + 1).unwrap_or(0)
    }

    // --- shared answering logic ------------------------------------------

    /// Apply one key to an in-progress question. Returns the outcome once
    /// the question has been answered.
    fn answer_key_outcome(
        ask: &mut AskState,
        key: KeyEvent,
        llm: &LlmClient,
    ) -> Option<(bool, String)> {
        match ask.question.body() {
            QuestionBody::MultipleChoice {
                options,
                correct_index,
            } => {
                let KeyCode::Char(c) = key.code else { return None };
                let choice = c.to_digit(10)? as usize;
                if choice == 0 || choice > options.len() {
                    return None;
                }
                let correct = choice - 1 == *correct_index;
                let text = if correct {
                    "Correct!".to_string()
                } else {
                    format!("Incorrect. Correct answer: {}", options[*correct_index])
                };
                Some((correct, text))
            }
            QuestionBody::Freeform { reference_answer } => match key.code {
                KeyCode::Enter => {
                    let answer = ask.answer_buffer.trim().to_string();
                    if answer.is_empty() {
                        return Some((false, "Empty answer counts as incorrect.".into()));
                    }
                    match llm.grade_freeform(&ask.question.text, reference_answer, &answer) {
                        Ok(verdict) => {
                            let result = if verdict.correct { "Correct!" } else { "Incorrect." };
                            Some((verdict.correct, format!("{}\n{}", result, verdict.explanation)))
                        }
                        Err(err) => {
                            warn!(%err, "freeform grading failed");
                            Some((
                                false,
                                format!("Could not evaluate answer automatically: {err}\nCounting as incorrect."),
                            ))
                        }
                    }
                }
                KeyCode::Backspace => {
                    ask.answer_buffer.pop();
                    None
                }
                KeyCode::Char(c) => {
                    ask.answer_buffer.push(c);
                    None
                }
                _ => None,
            },
        }
    }

    fn record(&mut self, id: crate::models::QuestionId, correct: bool) {
        if let Err(err) = self.manager.record_result(id, correct) {
            error!(%err, "failed to persist answer result");
            self.message = Some(format!("Save failed: {err}"));
        }
    }

    // --- statistics & management ------------------------------------------

    fn handle_stats_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
            self.back_to_menu();
        }
    }

    fn handle_manage_key(&mut self, key: KeyEvent) {
        let count = self.manager.questions().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if count > 0 {
                    self.manage_index = (self.manage_index + 1).min(count - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.manage_index = self.manage_index.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let Some(question) = self.manager.questions().get(self.manage_index) else {
                    return;
                };
                let id = question.id;
                match self.manager.toggle_active(id) {
                    Ok(true) => {
                        let question = self.manager.find(id);
                        let status = if question.map(|q| q.active).unwrap_or(false) {
                            "active"
                        } else {
                            "inactive"
                        };
                        self.message = Some(format!("Question {} is now {status}.", short_id(id)));
                    }
                    Ok(false) => {}
                    Err(err) => {
                        error!(%err, "failed to persist active flag");
                        self.message = Some(format!("Save failed: {err}"));
                    }
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => self.back_to_menu(),
            _ => {}
        }
    }
}

/// First eight hex characters of an id, as shown in listings.
pub fn short_id(id: crate::models::QuestionId) -> String {
    id.simple().to_string()[..8].to_string()
}

fn append_line(path: &std::path::Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}
