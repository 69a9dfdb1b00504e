//! Quadratic problems: wire payloads, a built-in fallback, and a local
//! generator
//!
//! The real problem service is an external API. The session only needs the
//! parsed shape plus a guaranteed way forward when the service is down.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A quadratic to solve. Catching any value in `correct` resolves the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub question: String,
    pub correct: Vec<i32>,
    pub distractors: Vec<i32>,
}

impl Problem {
    /// Built-in problem used whenever the problem service fails
    pub fn fallback() -> Self {
        Self {
            question: "x² - 5x + 6 = 0".to_string(),
            correct: vec![2, 3],
            distractors: vec![-2, -3],
        }
    }

    pub fn answer_count(&self) -> usize {
        self.correct.len() + self.distractors.len()
    }
}

/// Problem-service failures. Every one of them resolves to the fallback
/// problem; none reach the player.
#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("problem service returned status {0}")]
    Status(u16),
    #[error("problem service unreachable: {0}")]
    Network(String),
    #[error("malformed problem payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("problem payload has no correct answers")]
    NoCorrectAnswers,
}

/// Wire shape of a service response:
/// `{"question": ..., "answers": {"correct": [...], "distractors": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemPayload {
    pub question: String,
    pub answers: AnswerSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSet {
    pub correct: Vec<i32>,
    #[serde(default)]
    pub distractors: Vec<i32>,
}

/// Request body sent to the service
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProblemRequest {
    pub level: u32,
}

/// Parse and validate a service response
pub fn parse_payload(json: &str) -> Result<Problem, ProblemError> {
    let payload: ProblemPayload = serde_json::from_str(json)?;
    if payload.answers.correct.is_empty() {
        return Err(ProblemError::NoCorrectAnswers);
    }
    Ok(Problem {
        question: payload.question,
        correct: payload.answers.correct,
        distractors: payload.answers.distractors,
    })
}

/// Generate a quadratic with integer roots locally.
///
/// The same recipe the service uses: expand (x - r1)(x - r2) into
/// x² + bx + c = 0, offer the sign-flipped roots as distractors. Root
/// magnitude grows with level.
pub fn generate(level: u32, rng: &mut Pcg32) -> Problem {
    let bound = 3 + level.min(9) as i32;
    fn roll(rng: &mut Pcg32, bound: i32) -> i32 {
        loop {
            let r = rng.random_range(-bound..=bound);
            if r != 0 {
                return r;
            }
        }
    }

    let r1 = roll(rng, bound);
    let r2 = loop {
        let r = roll(rng, bound);
        if r != r1 {
            break r;
        }
    };

    let b = -(r1 + r2);
    let c = r1 * r2;
    let correct = vec![r1, r2];

    // Sign-flipped roots look plausible; nudge any that collide with a real
    // root so every distractor is actually wrong.
    let mut distractors = Vec::with_capacity(2);
    for r in [r1, r2] {
        let mut d = -r;
        while correct.contains(&d) || distractors.contains(&d) {
            d += 1;
        }
        distractors.push(d);
    }

    Problem {
        question: format_quadratic(b, c),
        correct,
        distractors,
    }
}

/// Render x² + bx + c = 0 with conventional sign formatting
fn format_quadratic(b: i32, c: i32) -> String {
    let mut q = String::from("x²");
    if b != 0 {
        let sign = if b < 0 { '-' } else { '+' };
        if b.abs() == 1 {
            q.push_str(&format!(" {sign} x"));
        } else {
            q.push_str(&format!(" {sign} {}x", b.abs()));
        }
    }
    if c != 0 {
        let sign = if c < 0 { '-' } else { '+' };
        q.push_str(&format!(" {sign} {}", c.abs()));
    }
    q.push_str(" = 0");
    q
}
