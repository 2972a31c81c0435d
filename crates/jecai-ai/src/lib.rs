//! AI layer: prompt construction for the drafting agents and the Gemini
//! `generateContent` client.

pub mod prompts;

#[cfg(feature = "http")]
pub mod agents;
#[cfg(feature = "http")]
pub mod gemini;

pub use prompts::{Evidence, Part, PetitionRequest};

#[cfg(feature = "http")]
pub use agents::{Agents, Draft};
#[cfg(feature = "http")]
pub use gemini::{AiError, GeminiClient, Generation};
