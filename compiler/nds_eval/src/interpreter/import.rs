//! `import` statements.

use std::sync::Arc;

use nds_ir::{ImportKind, ImportStmt};

use super::Interpreter;
use crate::control::Completion;
use crate::errors::EvalResult;
use crate::value::Value;

impl Interpreter {
    /// Register the definitions an import brings in. Later definitions
    /// with the same name replace earlier ones, as local definitions do.
    pub(super) fn exec_import(&mut self, stmt: &ImportStmt) -> EvalResult<Completion> {
        let module = self.session.imports.resolve(&stmt.path)?;
        let imported = module.select(&stmt.kind);
        for name in &imported.missing {
            self.session
                .warn(format!("'{name}' not found in '{}'", stmt.path));
        }

        {
            let mut functions = self.session.functions.write();
            for def in &imported.functions {
                functions.insert(def.name.clone(), Arc::clone(def));
            }
        }
        {
            let mut macros = self.session.macros.write();
            for def in &imported.macros {
                macros.register(Arc::clone(def));
            }
        }

        let counts = format!(
            "{} functions, {} macros",
            imported.functions.len(),
            imported.macros.len()
        );
        self.session.confirm(&match &stmt.kind {
            ImportKind::All => format!("Imported '{}': {counts}", stmt.path),
            ImportKind::Namespace(alias) => {
                format!("Imported '{}' as '{alias}': {counts}", stmt.path)
            }
            ImportKind::Selected(_) => format!(
                "Selectively imported {} symbols from '{}'",
                imported.len(),
                stmt.path
            ),
        });
        Ok(Completion::Normal(Value::string(module.key.as_str())))
    }
}
