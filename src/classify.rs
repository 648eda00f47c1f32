//! Keyword-based status inference for recruiting rows.
//!
//! This is a heuristic over free text, not a reliable classification. The
//! keyword tables are plain data so deployments can swap them.

use crate::config::ClassifierConfig;

pub const STATUS_SHORTLISTED: &str = "shortlisted";
pub const STATUS_IN_PROCESS: &str = "in_process";

const MEETING_KEYWORDS: &[&str] = &[
   "meet.google.com",
   "zoom.us",
   "teams.microsoft.com",
   "interview scheduled",
   "meeting link",
];

const IN_PROCESS_KEYWORDS: &[&str] = &["calling", "pending"];

#[derive(Debug, Clone)]
pub struct Classifier {
   pub meeting:          Vec<String>,
   pub in_process:       Vec<String>,
   pub unmatched_status: String,
}

impl Default for Classifier {
   fn default() -> Self {
      Self::new(STATUS_SHORTLISTED)
   }
}

fn owned(words: &[&str]) -> Vec<String> {
   words.iter().map(|w| (*w).to_string()).collect()
}

fn any_contains(cells: &[String], keywords: &[String]) -> bool {
   cells.iter().any(|cell| {
      let cell = cell.to_lowercase();
      keywords.iter().any(|k| cell.contains(k.as_str()))
   })
}

impl Classifier {
   pub fn new(unmatched_status: &str) -> Self {
      Self {
         meeting:          owned(MEETING_KEYWORDS),
         in_process:       owned(IN_PROCESS_KEYWORDS),
         unmatched_status: unmatched_status.to_string(),
      }
   }

   pub fn from_config(config: &ClassifierConfig) -> Self {
      Self::new(&config.unmatched_status)
   }

   /// True when any cell mentions a meeting platform or a scheduled interview.
   pub fn has_meeting(&self, cells: &[String]) -> bool {
      any_contains(cells, &self.meeting)
   }

   pub fn classify(&self, cells: &[String]) -> &str {
      if self.has_meeting(cells) {
         STATUS_SHORTLISTED
      } else if any_contains(cells, &self.in_process) {
         STATUS_IN_PROCESS
      } else {
         &self.unmatched_status
      }
   }

   /// A non-blank status cell wins over the derived status.
   pub fn status(&self, explicit: &str, cells: &[String]) -> String {
      let explicit = explicit.trim();
      if explicit.is_empty() {
         self.classify(cells).to_string()
      } else {
         explicit.to_string()
      }
   }
}
