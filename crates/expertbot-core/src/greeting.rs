//! Greeting short-circuit: small talk is answered locally without asking the
//! backend.

use rand::seq::SliceRandom;
use rand::Rng;

/// Words treated as a greeting, matched alone or followed by a space.
pub const GREETINGS: [&str; 11] = [
    "hi", "hello", "hey", "hii", "hiii", "hiiii", "helo", "hallo", "heya", "howdy", "greetings",
];

/// Canned replies to a greeting.
pub const GREETING_RESPONSES: [&str; 5] = [
    "Hello! I'm your Gujarat Civil Services expert system. How can I help you with rules and regulations today?",
    "Hi there! I can assist you with Gujarat Civil Services rules, disciplinary procedures, and related information. What would you like to know?",
    "Greetings! I'm here to help you understand Gujarat Civil Services rules and regulations. What can I assist you with?",
    "Hello! I'm your expert system for Gujarat Civil Services. What questions do you have about the rules and regulations?",
    "Hi! I can help you with information about Gujarat Civil Services rules, disciplinary procedures, and related matters. How may I assist you?",
];

/// Case-insensitive, whitespace-trimmed greeting check.
pub fn classify_greeting(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    GREETINGS.iter().any(|greeting| {
        normalized == *greeting
            || normalized
                .strip_prefix(greeting)
                .is_some_and(|rest| rest.starts_with(' '))
    })
}

/// Pick one canned reply uniformly at random.
pub fn respond_to_greeting<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    GREETING_RESPONSES
        .choose(rng)
        .copied()
        .unwrap_or(GREETING_RESPONSES[0])
}
