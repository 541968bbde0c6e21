//! Scenario rows as the terminal shows them.

use std::sync::{Mutex, PoisonError};

use keycheck_core::render_table;
use keycheck_engine::{ScenarioSpec, TriggerView};
use keycheck_types::{Outcome, PENDING_MARK, RunState};

pub const RUN_HEADERS: [&str; 5] = ["Scenario", "Expected", "Outcome", "Output", "Match"];
pub const CATALOGUE_HEADERS: [&str; 3] = ["Scenario", "Expected", "Description"];

#[derive(Debug, Clone)]
struct Row {
    selector: String,
    expected: Outcome,
    state: RunState,
}

impl Row {
    fn cells(&self) -> Vec<String> {
        let (outcome, output, mark) = match &self.state {
            RunState::Idle => (String::new(), String::new(), ""),
            RunState::Running => (PENDING_MARK.to_string(), String::new(), ""),
            RunState::Settled(settlement) => (
                settlement.outcome.to_string(),
                settlement.output.clone(),
                settlement.match_mark(),
            ),
        };
        vec![
            self.selector.clone(),
            self.expected.to_string(),
            outcome,
            output,
            mark.to_string(),
        ]
    }
}

/// Latest state of every attached trigger, in attach order.
#[derive(Debug, Default)]
pub struct TableView {
    rows: Mutex<Vec<Row>>,
}

impl TableView {
    /// Rows for `selectors`, in that order. Unknown selectors are skipped.
    pub fn render(&self, selectors: &[&str]) -> String {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let cells: Vec<Vec<String>> = selectors
            .iter()
            .filter_map(|selector| rows.iter().find(|row| row.selector == *selector))
            .map(Row::cells)
            .collect();
        render_table(&RUN_HEADERS, &cells)
    }
}

impl TriggerView for TableView {
    fn on_state(&self, selector: &str, expected: Outcome, state: &RunState) {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        match rows.iter_mut().find(|row| row.selector == selector) {
            Some(row) => row.state = state.clone(),
            None => rows.push(Row {
                selector: selector.to_string(),
                expected,
                state: state.clone(),
            }),
        }
    }
}

pub fn render_catalogue(catalogue: &[ScenarioSpec]) -> String {
    let cells: Vec<Vec<String>> = catalogue
        .iter()
        .map(|spec| {
            vec![
                spec.selector.to_string(),
                spec.expected.to_string(),
                spec.summary.to_string(),
            ]
        })
        .collect();
    render_table(&CATALOGUE_HEADERS, &cells)
}
