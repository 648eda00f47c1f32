//! Tenant schema configs: position-addressed column layouts per sheet format.
//!
//! Sheets are hand-edited and ragged, so reading a cell never fails; a short
//! row yields empty text. Column offsets mirror the real sheet layout and are
//! checked against the header row before each sync.

use crate::{Result, error::Error};

/// Logical field of a recruiting candidate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateField {
   Name,
   Email,
   Summary,
   MatchScore,
   ResumeText,
   Mobile,
   InterviewDate,
   Status,
   Transcript,
   JobDescription,
   MatchingSkills,
}

/// Logical field of an insurance customer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsuranceField {
   Name,
   MobileNumber,
   Email,
   Product,
   Vertical,
   PolicyNumber,
   Company,
   RegistrationNo,
   LastYearPremium,
   Premium,
   PremiumMode,
   RenewalDate,
   OdExpiryDate,
   TpExpiryDate,
   ActivatedDate,
   Status,
   ThankYouSent,
   ChequeHold,
   PaymentDate,
   ChequeNo,
   ChequeBounce,
   NewPolicyNo,
   NewCompany,
   PolicyDocLink,
   OwnerAlertSent,
   Reason,
   Notes,
}

/// One positional column and the header words that identify it.
#[derive(Debug)]
pub struct Column<F: 'static> {
   pub field:  F,
   pub index:  usize,
   pub header: &'static [&'static str],
}

/// A static sheet layout.
#[derive(Debug)]
pub struct Schema<F: 'static> {
   pub key:         &'static str,
   pub name:        &'static str,
   /// Lowercase substrings matched against the tenant email.
   pub identifiers: &'static [&'static str],
   pub columns:     &'static [Column<F>],
   /// Fields that must be non-empty for a row to produce a record.
   pub required:    &'static [F],
   pub last_column: &'static str,
}

impl<F: Copy + PartialEq + 'static> Schema<F> {
   pub fn position(&self, field: F) -> Option<usize> {
      self.columns.iter().find(|c| c.field == field).map(|c| c.index)
   }

   /// Cell text for `field`, or `""` when the row is too short.
   pub fn cell<'a>(&self, row: &'a [String], field: F) -> &'a str {
      self
         .position(field)
         .and_then(|i| row.get(i))
         .map_or("", String::as_str)
   }

   /// True when any required field is blank after trimming.
   pub fn missing_required(&self, row: &[String]) -> bool {
      self.required.iter().any(|f| self.cell(row, *f).trim().is_empty())
   }

   /// Number of cells a row rendered in this layout occupies.
   pub fn width(&self) -> usize {
      self.columns.iter().map(|c| c.index + 1).max().unwrap_or(0)
   }

   pub fn matches(&self, email: &str) -> bool {
      let email = email.to_lowercase();
      self.identifiers.iter().any(|id| email.contains(id))
   }

   /// Checks the header row against the expected column words.
   ///
   /// A blank header cell is accepted unless the column is required; a
   /// non-blank cell must contain one of the column's header words.
   pub fn validate_header(&self, header: &[String]) -> Result<()> {
      for column in self.columns {
         let found = header.get(column.index).map_or("", |h| h.trim());
         let expected = column.header.first().copied().unwrap_or("");
         let ok = if found.is_empty() {
            !self.required.contains(&column.field)
         } else {
            let lower = found.to_lowercase();
            column.header.iter().any(|w| lower.contains(w))
         };
         if !ok {
            return Err(Error::HeaderMismatch {
               schema: self.name,
               column: column.index,
               expected,
               found: found.to_string(),
            });
         }
      }
      Ok(())
   }
}

macro_rules! columns {
   ($($field:ident @ $index:literal => [$($word:literal),+ $(,)?]),* $(,)?) => {
      &[$(Column { field: $field, index: $index, header: &[$($word),+] }),*]
   };
}

pub static CANDIDATES: Schema<CandidateField> = {
   use CandidateField::*;
   Schema {
      key:         "candidates",
      name:        "Recruiting",
      identifiers: &[],
      columns:     columns![
         Name @ 0 => ["name", "candidate"],
         Email @ 1 => ["email", "mail"],
         Summary @ 2 => ["summary", "profile"],
         MatchScore @ 3 => ["score", "match", "%"],
         ResumeText @ 4 => ["resume", "cv"],
         Mobile @ 5 => ["mobile", "phone", "contact", "number"],
         InterviewDate @ 6 => ["interview", "date", "schedule"],
         Status @ 7 => ["status", "stage"],
         Transcript @ 8 => ["transcript", "call", "link", "meet"],
         JobDescription @ 9 => ["job", "jd", "description", "role"],
         MatchingSkills @ 10 => ["skill"],
      ],
      required:    &[Name, Email],
      last_column: "K",
   }
};

pub static KMG: Schema<InsuranceField> = {
   use InsuranceField::*;
   Schema {
      key:         "kmg",
      name:        "KMG Insurance",
      identifiers: &["kmg", "kmginsurance"],
      columns:     columns![
         Name @ 0 => ["name", "customer", "insured"],
         MobileNumber @ 1 => ["mobile", "phone", "contact"],
         ActivatedDate @ 2 => ["activ", "start", "issue"],
         RenewalDate @ 3 => ["renew", "due"],
         OdExpiryDate @ 4 => ["od"],
         TpExpiryDate @ 5 => ["tp"],
         PremiumMode @ 6 => ["mode"],
         Premium @ 7 => ["premium", "amount"],
         Vertical @ 8 => ["vertical", "type", "segment"],
         Product @ 9 => ["product", "plan"],
         RegistrationNo @ 10 => ["reg", "vehicle"],
         PolicyNumber @ 11 => ["policy"],
         Company @ 12 => ["company", "insurer"],
         Status @ 13 => ["status"],
         NewPolicyNo @ 14 => ["new policy", "policy"],
         NewCompany @ 15 => ["new company", "company", "insurer"],
         PolicyDocLink @ 16 => ["doc", "link"],
         ThankYouSent @ 17 => ["thank"],
         Reason @ 18 => ["reason", "remark"],
         Email @ 19 => ["email", "mail"],
         Notes @ 20 => ["note", "comment", "remark"],
      ],
      required:    &[Name, MobileNumber],
      last_column: "Y",
   }
};

pub static JOBAN: Schema<InsuranceField> = {
   use InsuranceField::*;
   Schema {
      key:         "joban",
      name:        "Joban Putra Insurance Shoppe",
      identifiers: &["joban", "jobanputra", "joban putra"],
      columns:     columns![
         Name @ 0 => ["name", "customer", "insured"],
         MobileNumber @ 1 => ["mobile", "phone", "contact"],
         Email @ 2 => ["email", "mail"],
         Product @ 3 => ["product", "plan"],
         Vertical @ 4 => ["vertical", "type", "segment"],
         PolicyNumber @ 5 => ["policy"],
         Company @ 6 => ["company", "insurer"],
         RegistrationNo @ 7 => ["reg", "vehicle"],
         LastYearPremium @ 8 => ["last year", "premium"],
         Premium @ 9 => ["premium", "amount"],
         PremiumMode @ 10 => ["mode"],
         RenewalDate @ 11 => ["expiry", "renew", "due"],
         TpExpiryDate @ 12 => ["tp"],
         ActivatedDate @ 13 => ["activ", "start", "issue"],
         Status @ 14 => ["status"],
         ThankYouSent @ 15 => ["thank"],
         ChequeHold @ 16 => ["hold", "cheque"],
         PaymentDate @ 17 => ["payment", "paid"],
         ChequeNo @ 18 => ["cheque", "check"],
         ChequeBounce @ 19 => ["bounce"],
         NewPolicyNo @ 20 => ["new policy", "policy"],
         NewCompany @ 21 => ["company", "insurer"],
         PolicyDocLink @ 22 => ["doc", "link"],
         OwnerAlertSent @ 23 => ["alert", "owner"],
         Notes @ 24 => ["note", "comment", "remark"],
      ],
      required:    &[Name, MobileNumber],
      last_column: "Y",
   }
};

static INSURANCE_SCHEMAS: [&Schema<InsuranceField>; 2] = [&KMG, &JOBAN];

/// Picks the insurance layout for a tenant email; unknown tenants get KMG.
pub fn resolve_insurance(email: &str) -> &'static Schema<InsuranceField> {
   INSURANCE_SCHEMAS
      .iter()
      .copied()
      .find(|s| s.matches(email))
      .unwrap_or(&KMG)
}
