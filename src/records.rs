//! Local record shapes and the row-to-record mapping for both verticals.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
   classify::Classifier,
   schema::{CandidateField, InsuranceField, Schema},
   types::SheetRowId,
};

/// Candidate fields mirrored from one sheet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CandidateRecord {
   pub sheet_row_id:    SheetRowId,
   pub name:            String,
   pub email:           String,
   pub mobile:          Option<String>,
   pub summary:         Option<String>,
   pub resume_text:     Option<String>,
   pub match_score:     Option<i64>,
   pub matching_skills: Option<String>,
   pub missing_skills:  Option<String>,
   pub status:          String,
   pub interview_date:  Option<String>,
   pub transcript:      Option<String>,
   pub job_description: Option<String>,
}

/// Stored candidate with its local-only columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Candidate {
   pub id:         i64,
   pub user_id:    i64,
   #[sqlx(flatten)]
   #[serde(flatten)]
   pub record:     CandidateRecord,
   pub created_at: NaiveDateTime,
   pub updated_at: NaiveDateTime,
}

/// Insurance customer fields mirrored from one sheet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InsuranceRecord {
   pub sheet_row_id:             SheetRowId,
   pub name:                     String,
   pub mobile_number:            String,
   pub email:                    String,
   pub product:                  String,
   pub vertical:                 String,
   pub current_policy_no:        String,
   pub company:                  String,
   pub registration_no:          String,
   pub premium:                  f64,
   pub premium_mode:             String,
   pub renewal_date:             String,
   pub od_expiry_date:           String,
   pub tp_expiry_date:           String,
   pub insurance_activated_date: String,
   pub status:                   String,
   pub thank_you_sent:           String,
   pub new_policy_no:            String,
   pub new_company:              String,
   pub policy_doc_link:          String,
   pub reason:                   String,
   pub notes:                    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InsuranceCustomer {
   pub id:         i64,
   pub user_id:    i64,
   #[sqlx(flatten)]
   #[serde(flatten)]
   pub record:     InsuranceRecord,
   pub created_at: NaiveDateTime,
   pub updated_at: NaiveDateTime,
}

fn optional(text: &str) -> Option<String> {
   let text = text.trim();
   (!text.is_empty()).then(|| text.to_string())
}

/// Length of the leading `[+-]?digits(.digits)?` prefix of `text`.
fn numeric_prefix(text: &str, allow_fraction: bool) -> &str {
   let bytes = text.as_bytes();
   let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
   let digits_start = end;
   while end < bytes.len() && bytes[end].is_ascii_digit() {
      end += 1;
   }
   if allow_fraction && end < bytes.len() && bytes[end] == b'.' {
      let mut frac = end + 1;
      while frac < bytes.len() && bytes[frac].is_ascii_digit() {
         frac += 1;
      }
      if frac > end + 1 || end > digits_start {
         end = frac;
      }
   }
   &text[..end]
}

/// Reads a match score such as `"80%"` or `"72 / 100"` as its leading integer.
pub fn parse_match_score(cell: &str) -> Option<i64> {
   let cleaned = cell.replacen('%', "", 1);
   numeric_prefix(cleaned.trim(), false).parse().ok()
}

/// Reads a premium such as `"25,000.50"`; anything unparsable is zero.
pub fn parse_premium(cell: &str) -> f64 {
   let cleaned = cell.replace(',', "");
   numeric_prefix(cleaned.trim(), true)
      .parse::<f64>()
      .ok()
      .filter(|v| v.is_finite())
      .unwrap_or(0.0)
}

/// Folds free-text verticals into `life`, `health`, `non-motor` or `motor`.
pub fn normalize_vertical(cell: &str) -> &'static str {
   let v = cell.trim().to_lowercase();
   if v.contains("life") {
      "life"
   } else if v.contains("health") {
      "health"
   } else if v.contains("non") && v.contains("motor") {
      "non-motor"
   } else {
      "motor"
   }
}

fn insurance_status(cell: &str) -> String {
   let status = cell.trim();
   if status.is_empty() { "pending".to_string() } else { status.to_lowercase() }
}

/// Maps data row `index` to a candidate, or `None` when name or email is blank.
pub fn map_candidate(
   schema: &Schema<CandidateField>,
   classifier: &Classifier,
   index: usize,
   row: &[String],
) -> Option<CandidateRecord> {
   use CandidateField as F;

   if schema.missing_required(row) {
      return None;
   }
   let cell = |f| schema.cell(row, f).trim();
   Some(CandidateRecord {
      sheet_row_id:    SheetRowId::for_data_row(index),
      name:            cell(F::Name).to_string(),
      email:           cell(F::Email).to_string(),
      mobile:          optional(cell(F::Mobile)),
      summary:         optional(cell(F::Summary)),
      resume_text:     optional(cell(F::ResumeText)),
      match_score:     parse_match_score(cell(F::MatchScore)),
      matching_skills: optional(cell(F::MatchingSkills)),
      missing_skills:  None,
      status:          classifier.status(cell(F::Status), row),
      interview_date:  optional(cell(F::InterviewDate)),
      transcript:      optional(cell(F::Transcript)),
      job_description: optional(cell(F::JobDescription)),
   })
}

/// Maps data row `index` to a customer, or `None` when name or mobile is blank.
pub fn map_insurance(
   schema: &Schema<InsuranceField>,
   index: usize,
   row: &[String],
) -> Option<InsuranceRecord> {
   use InsuranceField as F;

   if schema.missing_required(row) {
      return None;
   }
   let cell = |f| schema.cell(row, f).trim().to_string();
   Some(InsuranceRecord {
      sheet_row_id:             SheetRowId::for_data_row(index),
      name:                     cell(F::Name),
      mobile_number:            cell(F::MobileNumber),
      email:                    cell(F::Email),
      product:                  cell(F::Product),
      vertical:                 normalize_vertical(schema.cell(row, F::Vertical)).to_string(),
      current_policy_no:        cell(F::PolicyNumber),
      company:                  cell(F::Company),
      registration_no:          cell(F::RegistrationNo),
      premium:                  parse_premium(schema.cell(row, F::Premium)),
      premium_mode:             cell(F::PremiumMode),
      renewal_date:             cell(F::RenewalDate),
      od_expiry_date:           cell(F::OdExpiryDate),
      tp_expiry_date:           cell(F::TpExpiryDate),
      insurance_activated_date: cell(F::ActivatedDate),
      status:                   insurance_status(schema.cell(row, F::Status)),
      thank_you_sent:           cell(F::ThankYouSent),
      new_policy_no:            cell(F::NewPolicyNo),
      new_company:              cell(F::NewCompany),
      policy_doc_link:          cell(F::PolicyDocLink),
      reason:                   cell(F::Reason),
      notes:                    cell(F::Notes),
   })
}

impl InsuranceRecord {
   /// Sheet text for `field`; columns without a local counterpart are blank.
   pub fn field_text(&self, field: InsuranceField) -> String {
      use InsuranceField as F;

      match field {
         F::Name => self.name.clone(),
         F::MobileNumber => self.mobile_number.clone(),
         F::Email => self.email.clone(),
         F::Product => self.product.clone(),
         F::Vertical => capitalize(&self.vertical),
         F::PolicyNumber => self.current_policy_no.clone(),
         F::Company => self.company.clone(),
         F::RegistrationNo => self.registration_no.clone(),
         F::Premium if self.premium == 0.0 => String::new(),
         F::Premium => self.premium.to_string(),
         F::PremiumMode => self.premium_mode.clone(),
         F::RenewalDate => self.renewal_date.clone(),
         F::OdExpiryDate => self.od_expiry_date.clone(),
         F::TpExpiryDate => self.tp_expiry_date.clone(),
         F::ActivatedDate => self.insurance_activated_date.clone(),
         F::Status => self.status.clone(),
         F::ThankYouSent => self.thank_you_sent.clone(),
         F::NewPolicyNo => self.new_policy_no.clone(),
         F::NewCompany => self.new_company.clone(),
         F::PolicyDocLink => self.policy_doc_link.clone(),
         F::Reason => self.reason.clone(),
         F::Notes => self.notes.clone(),
         F::LastYearPremium
         | F::ChequeHold
         | F::PaymentDate
         | F::ChequeNo
         | F::ChequeBounce
         | F::OwnerAlertSent => String::new(),
      }
   }
}

fn capitalize(text: &str) -> String {
   let mut chars = text.chars();
   chars.next().map_or_else(String::new, |first| {
      first.to_uppercase().chain(chars).collect()
   })
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::schema::{CANDIDATES, JOBAN, KMG};

   fn row(cells: &[&str]) -> Vec<String> {
      cells.iter().map(|c| (*c).to_string()).collect()
   }

   #[test]
   fn match_score_reads_leading_integer() {
      assert_eq!(parse_match_score("80%"), Some(80));
      assert_eq!(parse_match_score(" 72 / 100"), Some(72));
      assert_eq!(parse_match_score("85.5"), Some(85));
      assert_eq!(parse_match_score("n/a"), None);
      assert_eq!(parse_match_score(""), None);
   }

   #[test]
   fn premium_strips_separators() {
      assert!((parse_premium("25,000.50") - 25000.5).abs() < f64::EPSILON);
      assert!((parse_premium("1200 INR") - 1200.0).abs() < f64::EPSILON);
      assert!((parse_premium("TBD")).abs() < f64::EPSILON);
   }

   #[test]
   fn verticals_fold_to_known_values() {
      assert_eq!(normalize_vertical("Life Insurance"), "life");
      assert_eq!(normalize_vertical("HEALTH"), "health");
      assert_eq!(normalize_vertical("Non Motor"), "non-motor");
      assert_eq!(normalize_vertical("Private Car"), "motor");
   }

   #[test]
   fn candidate_mapping_derives_status_and_id() {
      let cells = row(&["Jane", "jane@x.com", "", "80%", "", "555-1000", "", "", "meet.google.com/abc", "jd"]);
      let c = map_candidate(&CANDIDATES, &Classifier::default(), 0, &cells).unwrap();
      assert_eq!(c.sheet_row_id.as_str(), "row_2");
      assert_eq!(c.status, "shortlisted");
      assert_eq!(c.match_score, Some(80));
      assert_eq!(c.mobile.as_deref(), Some("555-1000"));
      assert_eq!(c.summary, None);
   }

   #[test]
   fn candidate_without_email_is_skipped() {
      let cells = row(&["Jane", "", "summary"]);
      assert!(map_candidate(&CANDIDATES, &Classifier::default(), 0, &cells).is_none());
   }

   #[test]
   fn insurance_mapping_follows_layout() {
      let kmg = row(&["Ravi", "98200", "01/01/2024", "01/01/2025", "", "", "Yearly", "12,500", "Health"]);
      let r = map_insurance(&KMG, 3, &kmg).unwrap();
      assert_eq!(r.sheet_row_id.as_str(), "row_5");
      assert_eq!(r.vertical, "health");
      assert_eq!(r.status, "pending");
      assert!((r.premium - 12500.0).abs() < f64::EPSILON);

      let joban = row(&["Asha", "98111", "asha@x.com", "Car", "Motor", "P-1", "ACME", "", "", "", "", "", "", "", "RENEWED"]);
      let r = map_insurance(&JOBAN, 0, &joban).unwrap();
      assert_eq!(r.email, "asha@x.com");
      assert_eq!(r.status, "renewed");
      assert_eq!(r.field_text(InsuranceField::Vertical), "Motor");
      assert_eq!(r.field_text(InsuranceField::Premium), "");
   }
}
