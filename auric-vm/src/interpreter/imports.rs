//! `IMPORT` execution: module loading and stub wiring.

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::function::{FnFlags, FunctionKind, ImportTarget};
use crate::module;
use crate::parser;
use crate::program::ProgramData;

use super::{ModuleState, Vm};

impl Vm {
    /// Execute one import-table entry.
    ///
    /// The module is parsed and its top level run exactly once per
    /// absolute path; the path is reserved before execution so a cycle
    /// is caught instead of recursing forever. Aliased imports then
    /// wire this module's stubs to the loaded module's exports.
    pub(crate) fn exec_import(
        &mut self,
        p_data: &Rc<ProgramData>,
        import_idx: usize,
    ) -> Result<(), RuntimeError> {
        let import = &p_data.imports[import_idx];
        let resolved = module::resolve(&import.path, &p_data.cwd).ok_or_else(|| {
            RuntimeError::InvalidImportPath {
                path: import.path.clone(),
            }
        })?;
        let canonical = resolved
            .canonicalize()
            .map_err(|source| RuntimeError::ModuleRead {
                path: resolved.clone(),
                source,
            })?;

        let module_idx = match self.modules_by_path.get(&canonical) {
            Some(ModuleState::Loaded(idx)) => *idx,
            Some(ModuleState::Reserved) => {
                return Err(RuntimeError::CircularImport { path: canonical })
            }
            None => {
                self.modules_by_path
                    .insert(canonical.clone(), ModuleState::Reserved);
                tracing::debug!(path = %canonical.display(), "loading module");

                let src = std::fs::read_to_string(&canonical).map_err(|source| {
                    RuntimeError::ModuleRead {
                        path: canonical.clone(),
                        source,
                    }
                })?;
                let cwd = canonical
                    .parent()
                    .map_or_else(|| p_data.cwd.clone(), |p| p.to_path_buf());
                let program = parser::parse_source(&src, Some(canonical.clone()), cwd).map_err(
                    |source| RuntimeError::ModuleParse {
                        path: canonical.clone(),
                        source: Box::new(source),
                    },
                )?;

                let module_idx = self.register_module(Rc::clone(&program.data));
                self.exec(&program.main, FnFlags::empty(), &program.data, Vec::new())?;
                self.modules_by_path
                    .insert(canonical.clone(), ModuleState::Loaded(module_idx));
                module_idx
            }
        };

        if let Some(alias_idx) = import.module_idx {
            self.wire_alias(p_data, alias_idx, module_idx, &canonical)?;
        }
        Ok(())
    }

    /// Point every stub recorded under an alias at the loaded module.
    fn wire_alias(
        &mut self,
        p_data: &Rc<ProgramData>,
        alias_idx: usize,
        module_idx: usize,
        canonical: &std::path::Path,
    ) -> Result<(), RuntimeError> {
        let loaded = Rc::clone(&self.modules[module_idx]);
        let stubs = &p_data.imported_modules[alias_idx];

        for (name, &stub_idx) in &stubs.fn_map {
            let FunctionKind::Import(import_fn) = &p_data.fns[stub_idx].kind else {
                return Err(RuntimeError::MalformedBytecode);
            };
            let target_idx =
                *loaded
                    .fn_map
                    .get(name)
                    .ok_or_else(|| RuntimeError::ImportResolution {
                        path: canonical.to_path_buf(),
                        name: name.clone(),
                    })?;
            let target = &loaded.fns[target_idx];
            if !target.flags.contains(FnFlags::EXPORTED) {
                return Err(RuntimeError::ImportResolution {
                    path: canonical.to_path_buf(),
                    name: name.clone(),
                });
            }
            if target.num_args() != import_fn.num_args {
                return Err(RuntimeError::ImportArity {
                    name: name.clone(),
                    got: import_fn.num_args,
                    expected: target.num_args(),
                });
            }
            import_fn.target.set(Some(ImportTarget {
                module: module_idx,
                fn_idx: target_idx,
            }));
        }

        for (name, &const_slot) in &stubs.const_map {
            let src_slot =
                *loaded
                    .exported_consts
                    .get(name)
                    .ok_or_else(|| RuntimeError::ImportResolution {
                        path: canonical.to_path_buf(),
                        name: name.clone(),
                    })?;
            let value = self.load_const(&loaded, src_slot);
            let cache_idx = p_data.tl_constant_start.get() + const_slot;
            self.consts[cache_idx] = Some(value);
        }
        Ok(())
    }
}
