//! Contract module validation — ABI compatibility checks.
//!
//! Validates a compiled module before execution:
//!
//! 1. A `memory` export is present
//! 2. All imports are functions from the host module, no WASI
//! 3. The requested entry point exists with the expected signature
//!
//! Entry points take `(args_ptr: i32, args_len: i32)` and return a packed
//! region `i64` (`0` = no result).

use wasmtime::{ExternType, Module, ValType};

use crate::error::VmError;

/// The import namespace contracts link against.
pub const HOST_MODULE: &str = "env";

/// The reserved constructor entry point.
pub const DEPLOY_ENTRY_POINT: &str = "deploy";

/// Validate that a module meets the runtime's ABI requirements.
pub fn validate_module(module: &Module) -> Result<(), VmError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == "memory" && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(VmError::bad_argument("module must export 'memory'"));
    }
    validate_imports(module)
}

/// Check that all imports are functions from the host namespace.
fn validate_imports(module: &Module) -> Result<(), VmError> {
    for import in module.imports() {
        let module_name = import.module();

        if module_name.starts_with("wasi") {
            return Err(VmError::bad_argument(format!(
                "WASI import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }

        if module_name != HOST_MODULE {
            return Err(VmError::bad_argument(format!(
                "import from unknown module '{}' (only '{}' allowed): {}",
                module_name,
                HOST_MODULE,
                import.name()
            )));
        }

        if !matches!(import.ty(), ExternType::Func(_)) {
            return Err(VmError::bad_argument(format!(
                "non-function import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }
    }
    Ok(())
}

/// Resolve a named entry point, checking its signature.
///
/// An absent or ill-typed entry point is the caller's fault: this fails
/// before any gas beyond the lookup is charged.
pub fn resolve_entry_point(module: &Module, name: &str) -> Result<(), VmError> {
    let export = module
        .get_export(name)
        .ok_or_else(|| VmError::bad_argument(format!("entry point not found: {name}")))?;

    let func_ty = match export {
        ExternType::Func(ft) => ft,
        _ => {
            return Err(VmError::bad_argument(format!(
                "export '{name}' is not a function"
            )));
        }
    };

    let params: Vec<ValType> = func_ty.params().collect();
    let results: Vec<ValType> = func_ty.results().collect();

    let params_ok = params.len() == 2 && params.iter().all(|p| matches!(p, ValType::I32));
    let results_ok = results.len() == 1 && matches!(results[0], ValType::I64);
    if !params_ok || !results_ok {
        return Err(VmError::bad_argument(format!(
            "entry point '{name}' has wrong signature: expected (i32, i32) -> i64"
        )));
    }

    Ok(())
}
