//! Plain-text tables for the registrations view and scenario rows.

use std::iter;

use keycheck_types::{RegistrationRecord, strip_control, truncate_id};

pub const REGISTRATION_HEADERS: [&str; 3] = ["Key ID", "User Name", "Registration Level"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRow {
    pub key_id: String,
    pub user_name: String,
    pub registration_level: &'static str,
}

impl RegistrationRow {
    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.key_id.clone(),
            self.user_name.clone(),
            self.registration_level.to_string(),
        ]
    }
}

/// One row per record, sorted by user name then id so repeated renders agree.
#[must_use]
pub fn registration_rows(records: &[RegistrationRecord], id_prefix_len: usize) -> Vec<RegistrationRow> {
    let mut sorted: Vec<&RegistrationRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.user_name.cmp(&b.user_name).then_with(|| a.id.cmp(&b.id)));
    sorted
        .into_iter()
        .map(|record| RegistrationRow {
            key_id: truncate_id(record.id.as_str(), id_prefix_len),
            user_name: strip_control(&record.user_name).into_owned(),
            registration_level: record.registration_level.as_str(),
        })
        .collect()
}

/// Left-aligned columns separated by two spaces. Newlines inside a cell are
/// flattened to ` / `.
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let flatten = |cell: &str| strip_control(cell).replace('\n', " / ");
    let header_cells: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| flatten(cell)).collect())
        .collect();

    let mut widths: Vec<usize> = header_cells.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (i, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(width),
                None => widths.push(width),
            }
        }
    }

    let mut out = String::new();
    for row in iter::once(&header_cells).chain(body.iter()) {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(cell);
            let pad = widths[i].saturating_sub(cell.chars().count());
            line.extend(iter::repeat_n(' ', pad));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use keycheck_types::{AttestationPayload, CredentialId, RegistrationLevel, RegistrationRecord};

    use super::{REGISTRATION_HEADERS, registration_rows, render_table};

    fn record(id: &str, user: &str, level: RegistrationLevel) -> RegistrationRecord {
        RegistrationRecord {
            id: CredentialId::parse(id).unwrap(),
            registration_level: level,
            user_name: user.to_string(),
            attestation: AttestationPayload::new(serde_json::Value::Null),
        }
    }

    #[test]
    fn rows_are_sorted_and_truncated() {
        let rows = registration_rows(
            &[
                record("zzzzzzzzzzzz", "test_user", RegistrationLevel::SecurityKey),
                record("aaaaaaaaaaaa", "test_user", RegistrationLevel::TrustedDevice),
                record("mmmmmmmmmmmm", "alice", RegistrationLevel::DiscoverablePasskey),
            ],
            4,
        );
        let keys: Vec<&str> = rows.iter().map(|r| r.key_id.as_str()).collect();
        assert_eq!(keys, vec!["mmmm???", "aaaa???", "zzzz???"]);
        assert_eq!(rows[0].registration_level, "discoverable-passkey");
    }

    #[test]
    fn user_names_are_stripped_of_escapes() {
        let rows = registration_rows(
            &[record("AAAA", "evil\x1b[2Jname", RegistrationLevel::SecurityKey)],
            8,
        );
        assert_eq!(rows[0].user_name, "evilname");
    }

    #[test]
    fn table_pads_columns() {
        let table = render_table(
            &REGISTRATION_HEADERS,
            &[vec!["AAAA???".into(), "u".into(), "security-key".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Key ID   User Name  Registration Level");
        assert_eq!(lines[1], "AAAA???  u          security-key");
    }

    #[test]
    fn table_flattens_multiline_cells() {
        let table = render_table(&["a"], &[vec!["ID: x\nUser UUID: y".into()]]);
        assert!(table.contains("ID: x / User UUID: y"));
    }
}
