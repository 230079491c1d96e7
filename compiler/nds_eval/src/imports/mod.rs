//! Module imports.
//!
//! A [`ModuleLoader`] turns an import path into an already-parsed
//! [`Program`]; parsing belongs to the front end. The [`ImportResolver`]
//! collects the function and macro definitions of that program, follows its
//! own imports, caches each module by its canonical key and rejects import
//! cycles. Only definitions cross a module boundary: top-level assignments
//! and commands of an imported file never run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nds_ir::{Definition, ImportKind, Name, Program, StmtKind};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{
    circular_import, imports_unavailable, module_load_failed, module_not_found, EvalResult,
};

/// Extension appended to import paths that carry none.
pub const DEFAULT_MODULE_EXTENSION: &str = ".ndx";

const MODULE_EXTENSIONS: [&str; 2] = [".ndx", ".nds"];

/// Source of imported modules.
pub trait ModuleLoader: Send + Sync {
    /// Canonical key of `path`, or `None` when no module matches. Two paths
    /// naming the same module must resolve to the same key.
    fn resolve(&self, path: &str) -> Option<String>;

    fn load(&self, key: &str) -> Result<Program, String>;
}

/// Strip surrounding quotes and add [`DEFAULT_MODULE_EXTENSION`] when the
/// path has no script extension.
pub fn normalize_module_path(path: &str) -> String {
    let path = path.trim().trim_matches(|c| c == '"' || c == '\'');
    if MODULE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        path.to_string()
    } else {
        format!("{path}{DEFAULT_MODULE_EXTENSION}")
    }
}

/// In-memory modules keyed by normalized path.
#[derive(Default)]
pub struct MemoryModuleLoader {
    modules: RwLock<FxHashMap<String, Program>>,
}

impl MemoryModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, program: Program) {
        self.modules
            .write()
            .insert(normalize_module_path(path), program);
    }

    #[must_use]
    pub fn with_module(self, path: &str, program: Program) -> Self {
        self.insert(path, program);
        self
    }
}

impl ModuleLoader for MemoryModuleLoader {
    fn resolve(&self, path: &str) -> Option<String> {
        let key = normalize_module_path(path);
        self.modules.read().contains_key(&key).then_some(key)
    }

    fn load(&self, key: &str) -> Result<Program, String> {
        self.modules
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| format!("no module named '{key}'"))
    }
}

/// Front-end parser used by [`FileModuleLoader`].
pub type SourceParser = Arc<dyn Fn(&str) -> Result<Program, String> + Send + Sync>;

/// Script files found through a list of search directories.
///
/// Absolute paths are used as given; relative paths are tried against each
/// search directory in order. Keys are canonical file paths.
pub struct FileModuleLoader {
    search_paths: Vec<PathBuf>,
    parse: SourceParser,
}

impl FileModuleLoader {
    /// Loader searching the working directory.
    pub fn new(parse: SourceParser) -> Self {
        FileModuleLoader {
            search_paths: vec![PathBuf::from(".")],
            parse,
        }
    }

    /// Append `dir` to the search list unless it is already there.
    pub fn add_search_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.search_paths.contains(&dir) {
            self.search_paths.push(dir);
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn candidates(&self, path: &Path) -> Vec<PathBuf> {
        if path.is_absolute() {
            vec![path.to_path_buf()]
        } else {
            self.search_paths.iter().map(|dir| dir.join(path)).collect()
        }
    }
}

impl ModuleLoader for FileModuleLoader {
    fn resolve(&self, path: &str) -> Option<String> {
        let normalized = normalize_module_path(path);
        self.candidates(Path::new(&normalized))
            .into_iter()
            .find(|candidate| candidate.is_file())
            .and_then(|found| fs::canonicalize(found).ok())
            .map(|found| found.to_string_lossy().into_owned())
    }

    fn load(&self, key: &str) -> Result<Program, String> {
        let source = fs::read_to_string(key).map_err(|e| e.to_string())?;
        (self.parse)(&source)
    }
}

/// Definitions exported by one module, its own imports included.
#[derive(Debug, Default)]
pub struct Module {
    pub key: String,
    pub functions: FxHashMap<Name, Arc<Definition>>,
    pub macros: FxHashMap<Name, Arc<Definition>>,
}

/// What one import statement brings into scope.
#[derive(Debug, Default)]
pub struct Imported {
    pub functions: Vec<Arc<Definition>>,
    pub macros: Vec<Arc<Definition>>,
    /// Selected names the module does not define.
    pub missing: Vec<Name>,
}

impl Imported {
    pub fn len(&self) -> usize {
        self.functions.len() + self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Module {
    fn new(key: String) -> Self {
        Module {
            key,
            ..Module::default()
        }
    }

    /// Definitions visible through an import of the given form. Namespace
    /// imports rename each definition to `alias.name`.
    pub fn select(&self, kind: &ImportKind) -> Imported {
        let mut imported = Imported::default();
        match kind {
            ImportKind::All => {
                imported.functions = sorted(&self.functions);
                imported.macros = sorted(&self.macros);
            }
            ImportKind::Namespace(alias) => {
                let qualify = |def: Arc<Definition>| {
                    Arc::new(Definition {
                        name: Name::from(format!("{alias}.{}", def.name)),
                        ..(*def).clone()
                    })
                };
                imported.functions = sorted(&self.functions).into_iter().map(qualify).collect();
                imported.macros = sorted(&self.macros).into_iter().map(qualify).collect();
            }
            ImportKind::Selected(names) => {
                for name in names {
                    if let Some(def) = self.functions.get(name) {
                        imported.functions.push(Arc::clone(def));
                    } else if let Some(def) = self.macros.get(name) {
                        imported.macros.push(Arc::clone(def));
                    } else {
                        imported.missing.push(name.clone());
                    }
                }
            }
        }
        imported
    }

    fn absorb(&mut self, imported: Imported) {
        for def in imported.functions {
            self.functions.insert(def.name.clone(), def);
        }
        for def in imported.macros {
            self.macros.insert(def.name.clone(), def);
        }
    }
}

fn sorted(defs: &FxHashMap<Name, Arc<Definition>>) -> Vec<Arc<Definition>> {
    let mut defs: Vec<Arc<Definition>> = defs.values().cloned().collect();
    defs.sort_by(|a, b| a.name.cmp(&b.name));
    defs
}

/// Loads modules through a [`ModuleLoader`] and caches them by key.
pub struct ImportResolver {
    loader: Option<Arc<dyn ModuleLoader>>,
    cache: RwLock<FxHashMap<String, Arc<Module>>>,
}

impl ImportResolver {
    pub fn new(loader: Option<Arc<dyn ModuleLoader>>) -> Self {
        ImportResolver {
            loader,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// The module at `path`, loading it and its imports on first use.
    pub fn resolve(&self, path: &str) -> EvalResult<Arc<Module>> {
        self.resolve_within(path, &mut Vec::new())
    }

    /// `stack` holds the keys of modules currently being collected.
    fn resolve_within(&self, path: &str, stack: &mut Vec<String>) -> EvalResult<Arc<Module>> {
        let loader = self.loader.as_ref().ok_or_else(|| imports_unavailable(path))?;
        let key = loader.resolve(path).ok_or_else(|| module_not_found(path))?;

        if stack.contains(&key) {
            let mut chain = stack.clone();
            chain.push(key);
            return Err(circular_import(chain));
        }
        if let Some(module) = self.cache.read().get(&key) {
            tracing::trace!(%key, "module cache hit");
            return Ok(Arc::clone(module));
        }

        let program = loader
            .load(&key)
            .map_err(|message| module_load_failed(&key, message))?;
        stack.push(key.clone());
        let collected = self.collect(key.clone(), &program, stack);
        stack.pop();

        let module = Arc::new(collected?);
        tracing::debug!(
            %key,
            functions = module.functions.len(),
            macros = module.macros.len(),
            "module loaded"
        );
        self.cache.write().insert(key, Arc::clone(&module));
        Ok(module)
    }

    fn collect(
        &self,
        key: String,
        program: &Program,
        stack: &mut Vec<String>,
    ) -> EvalResult<Module> {
        let mut module = Module::new(key);
        for stmt in &program.statements {
            match &stmt.kind {
                StmtKind::FunctionDef(def) => {
                    module.functions.insert(def.name.clone(), Arc::clone(def));
                }
                StmtKind::MacroDef(def) => {
                    module.macros.insert(def.name.clone(), Arc::clone(def));
                }
                StmtKind::Import(import) => {
                    let inner = self
                        .resolve_within(&import.path, stack)
                        .map_err(|e| e.or_span(stmt.span))?;
                    let imported = inner.select(&import.kind);
                    for name in &imported.missing {
                        tracing::warn!(
                            module = %module.key,
                            path = %import.path,
                            %name,
                            "imported name not found"
                        );
                    }
                    module.absorb(imported);
                }
                _ => {}
            }
        }
        Ok(module)
    }

    /// Keys of every cached module, sorted.
    pub fn imported_modules(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.cache.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_imported(&self, key: &str) -> bool {
        self.cache.read().contains_key(key)
    }

    /// Forget every loaded module; the next import reloads from the loader.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }
}
