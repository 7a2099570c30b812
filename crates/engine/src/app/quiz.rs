use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::SimError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub text: String,
    pub answers: Vec<String>,
    /// One flag per entry in `answers`.
    pub correct: Vec<bool>,
}

#[derive(Debug, Error)]
pub enum QuizBankError {
    #[error("failed to parse question bank json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question {index} has {answers} answer(s) but {correct} correctness flag(s)")]
    AnswerShape {
        index: usize,
        answers: usize,
        correct: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizBankError> {
        for (index, question) in questions.iter().enumerate() {
            if question.answers.len() != question.correct.len() {
                return Err(QuizBankError::AnswerShape {
                    index,
                    answers: question.answers.len(),
                    correct: question.correct.len(),
                });
            }
        }
        Ok(Self { questions })
    }

    /// Parses a JSON array of `{ "text", "answers", "correct" }` objects.
    pub fn from_json_str(raw: &str) -> Result<Self, QuizBankError> {
        let questions: Vec<Question> = serde_json::from_str(raw)?;
        Self::new(questions)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub question_index: usize,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuizState {
    Idle,
    AwaitingAnswer { question: usize },
}

/// Modal question/answer state machine. Questions are asked in bank order,
/// wrapping around.
#[derive(Debug, Clone)]
pub struct QuizEngine {
    bank: QuestionBank,
    state: QuizState,
    next_question: usize,
    answer: Vec<bool>,
    have_answer: bool,
    waited_ms: u64,
}

impl QuizEngine {
    pub fn new(bank: QuestionBank) -> Self {
        Self {
            bank,
            state: QuizState::Idle,
            next_question: 0,
            answer: Vec::new(),
            have_answer: false,
            waited_ms: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, QuizState::AwaitingAnswer { .. })
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            QuizState::AwaitingAnswer { question } => self.bank.get(question),
            QuizState::Idle => None,
        }
    }

    pub fn has_answer(&self) -> bool {
        self.have_answer
    }

    pub fn last_answer(&self) -> Option<&[bool]> {
        self.have_answer.then_some(self.answer.as_slice())
    }

    /// Time spent waiting on the current question.
    pub fn waited_ms(&self) -> u64 {
        self.waited_ms
    }

    /// Returns the index of the question now awaiting an answer.
    pub fn start_quiz(&mut self) -> Result<usize, SimError> {
        if self.is_active() {
            return Err(SimError::InvalidState {
                operation: "start_quiz",
                reason: "a question is already awaiting an answer",
            });
        }
        if self.bank.is_empty() {
            return Err(SimError::InvalidState {
                operation: "start_quiz",
                reason: "the question bank is empty",
            });
        }
        let question = self.next_question % self.bank.len();
        self.next_question = question + 1;
        self.state = QuizState::AwaitingAnswer { question };
        self.have_answer = false;
        self.answer.clear();
        self.waited_ms = 0;
        info!(question, "quiz_started");
        Ok(question)
    }

    pub fn provide_answer(&mut self, selections: Vec<bool>) -> Result<QuizOutcome, SimError> {
        let QuizState::AwaitingAnswer { question } = self.state else {
            return Err(SimError::InvalidState {
                operation: "provide_answer",
                reason: "no question is awaiting an answer",
            });
        };
        let Some(asked) = self.bank.get(question) else {
            return Err(SimError::InvalidState {
                operation: "provide_answer",
                reason: "the asked question is missing from the bank",
            });
        };
        if selections.len() != asked.answers.len() {
            return Err(SimError::InvalidState {
                operation: "provide_answer",
                reason: "selection count does not match the answer count",
            });
        }

        let correct = selections == asked.correct;
        self.answer = selections;
        self.have_answer = true;
        self.state = QuizState::Idle;
        info!(question, correct, waited_ms = self.waited_ms, "quiz_answered");
        Ok(QuizOutcome {
            question_index: question,
            correct,
        })
    }

    /// No deadline is enforced; waiting time is only recorded.
    pub fn run_tick(&mut self, delta_ms: u64) {
        if self.is_active() {
            self.waited_ms = self.waited_ms.saturating_add(delta_ms);
        }
    }
}
