//! Formula field computation
//!
//! Formula fields may read other formula fields, so a record's formulas are
//! evaluated in dependency order. Fields on a cycle, or downstream of one,
//! are stored as null.

use crate::resolve::field_references;
use crate::FormulaEngine;
use std::collections::{HashMap, VecDeque};
use tally_core::{FormulaValue, RecordData, RecordValue};
use tally_fields::{FieldDefinition, FieldType};
use tracing::{debug, warn};

/// Evaluation order over formula fields, plus the fields left on cycles.
///
/// `dependencies[i]` lists the indices field `i` reads. Kahn's algorithm,
/// seeded in declaration order so the result is stable.
pub fn dependency_order(dependencies: &[Vec<usize>]) -> (Vec<usize>, Vec<usize>) {
    let n = dependencies.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (field, deps) in dependencies.iter().enumerate() {
        for &dep in deps {
            in_degree[field] += 1;
            dependents[dep].push(field);
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &dependent in &dependents[node] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    let cyclic = (0..n).filter(|&i| in_degree[i] > 0).collect();
    (order, cyclic)
}

pub fn to_record_value(value: FormulaValue) -> RecordValue {
    match value {
        FormulaValue::Number(n) => RecordValue::Number(n),
        FormulaValue::Text(s) => RecordValue::Text(s),
        FormulaValue::Bool(b) => RecordValue::Bool(b),
        FormulaValue::Null => RecordValue::Null,
    }
}

impl FormulaEngine {
    /// Evaluate every formula field of `record` and store the results in it
    pub fn compute_formula_fields(&self, record: &mut RecordData, fields: &[FieldDefinition], collection_id: &str) {
        let formulas: Vec<(&str, &str)> = fields
            .iter()
            .filter(|f| f.field_type == FieldType::Formula)
            .filter_map(|f| f.formula_text().map(|text| (f.name.as_str(), text)))
            .collect();
        if formulas.is_empty() {
            return;
        }

        let index: HashMap<&str, usize> = formulas.iter().enumerate().map(|(i, (name, _))| (*name, i)).collect();
        let dependencies: Vec<Vec<usize>> = formulas
            .iter()
            .map(|(_, text)| {
                field_references(text)
                    .iter()
                    .filter_map(|name| index.get(name.as_str()).copied())
                    .collect()
            })
            .collect();

        let (order, cyclic) = dependency_order(&dependencies);

        for i in order {
            let (name, text) = formulas[i];
            let value = self.evaluate_formula(text, record, collection_id);
            record.insert(name.to_string(), to_record_value(value));
        }

        if !cyclic.is_empty() {
            let names: Vec<&str> = cyclic.iter().map(|&i| formulas[i].0).collect();
            warn!(collection_id, fields = ?names, "circular formula references; storing null");
            for name in names {
                record.insert(name.to_string(), RecordValue::Null);
            }
        }
        debug!(collection_id, formulas = formulas.len(), "computed formula fields");
    }
}
