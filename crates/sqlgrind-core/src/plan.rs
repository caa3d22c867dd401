//! The op-script model scenario bodies emit.
//!
//! A scenario body is a pure function from validated packet fields to a
//! [`Plan`]: an ordered script of engine operations. Keeping the script a
//! plain value buys the two properties the fuzzer needs — the same input
//! always produces the same script, and tests can inspect or replay a
//! script against a recording engine without touching the real one.

use serde::Serialize;

/// Which connection an op runs on. Concurrency scenarios interleave two
/// connections from one thread; everything else uses the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnTarget {
    Primary,
    Secondary,
}

/// A typed parameter bound into a prepared statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One engine operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineOp {
    /// Prepare and step a single statement to completion.
    Exec { target: ConnTarget, sql: String },
    /// Prepare a single statement, bind parameters, step to completion.
    Query {
        target: ConnTarget,
        sql: String,
        binds: Vec<SqlValue>,
    },
    /// Run a multi-statement script (the raw SQL tail path).
    Script { target: ConnTarget, sql: String },
    /// Adjust the engine's hard heap limit; 0 removes the limit.
    HeapLimit { bytes: i64 },
}

/// An ordered script of operations plus the scenario label that produced
/// it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub label: &'static str,
    pub ops: Vec<EngineOp>,
}

impl Plan {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            ops: Vec::new(),
        }
    }

    pub fn exec(&mut self, sql: impl Into<String>) {
        self.exec_on(ConnTarget::Primary, sql);
    }

    pub fn exec_on(&mut self, target: ConnTarget, sql: impl Into<String>) {
        self.ops.push(EngineOp::Exec {
            target,
            sql: sql.into(),
        });
    }

    pub fn query(&mut self, sql: impl Into<String>, binds: Vec<SqlValue>) {
        self.ops.push(EngineOp::Query {
            target: ConnTarget::Primary,
            sql: sql.into(),
            binds,
        });
    }

    pub fn script(&mut self, sql: impl Into<String>) {
        self.script_on(ConnTarget::Primary, sql);
    }

    pub fn script_on(&mut self, target: ConnTarget, sql: impl Into<String>) {
        self.ops.push(EngineOp::Script {
            target,
            sql: sql.into(),
        });
    }

    pub fn heap_limit(&mut self, bytes: i64) {
        self.ops.push(EngineOp::HeapLimit { bytes });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Whether any op in the script targets the secondary connection.
    pub fn uses_secondary(&self) -> bool {
        self.ops.iter().any(|op| {
            matches!(
                op,
                EngineOp::Exec {
                    target: ConnTarget::Secondary,
                    ..
                } | EngineOp::Query {
                    target: ConnTarget::Secondary,
                    ..
                } | EngineOp::Script {
                    target: ConnTarget::Secondary,
                    ..
                }
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_order() {
        let mut plan = Plan::new("t");
        plan.exec("CREATE TABLE t(a);");
        plan.query("INSERT INTO t VALUES (?1);", vec![SqlValue::Integer(1)]);
        plan.script("SELECT 1; SELECT 2;");
        plan.heap_limit(0);
        assert_eq!(plan.len(), 4);
        assert!(matches!(plan.ops[0], EngineOp::Exec { .. }));
        assert!(matches!(plan.ops[3], EngineOp::HeapLimit { bytes: 0 }));
    }

    #[test]
    fn uses_secondary_detects_any_target() {
        let mut plan = Plan::new("t");
        plan.exec("SELECT 1;");
        assert!(!plan.uses_secondary());
        plan.exec_on(ConnTarget::Secondary, "SELECT 2;");
        assert!(plan.uses_secondary());
    }

    #[test]
    fn plans_compare_structurally() {
        let mut a = Plan::new("t");
        a.exec("SELECT 1;");
        let mut b = Plan::new("t");
        b.exec("SELECT 1;");
        assert_eq!(a, b);
        b.exec("SELECT 2;");
        assert_ne!(a, b);
    }
}
