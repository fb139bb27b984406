//! PyO3 boundary: the `tco` extension module. Exposes `tco.optimize`, the
//! user-facing decorator, and `tco.debug.pretty_print` for tests and
//! debugging. All validation and rewriting happens in `tco_core`; this
//! crate's job is source acquisition, namespace assembly, and copying
//! metadata onto the re-materialized callable, reached through the host
//! interpreter rather than reimplemented here.
//!
//! Re-materialization compiles the rewritten definition from its
//! pretty-printed source rather than constructing live `ast` module objects
//! node-by-node: building those objects node-by-node needs codegen'd impls
//! for every generated node type that aren't available here, and
//! `tco_core::printer` already round-trips our own synthesized nodes
//! faithfully (it only ever has to print nodes this crate's own transformer
//! produced). See DESIGN.md for the ledger entry.

use pyo3::exceptions::{PyRuntimeError, PySyntaxError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple};

use tco_core::{Config, TcoError};

const DECORATOR_NAME: &str = "optimize";

fn tco_error_to_py(err: TcoError) -> PyErr {
    match err {
        TcoError::NotTailRecursive { violations } => {
            let detail = violations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            PyValueError::new_err(format!("not tail-recursive: {detail}"))
        }
        TcoError::ArgumentShape { reason } => PyValueError::new_err(reason),
        TcoError::SourceUnavailable { reason } => PyRuntimeError::new_err(reason),
        other => PyTypeError::new_err(other.to_string()),
    }
}

/// `inspect.getsource` on anything but a module-level function can carry
/// leading indentation (a function defined in a test body, a REPL frame);
/// strip it so the result still parses standalone.
fn dedent(source: &str) -> String {
    let min_indent = source
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut out: String = source
        .lines()
        .map(|l| if l.len() >= min_indent { &l[min_indent..] } else { l })
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

fn copy_metadata(original: &PyAny, new_func: &PyAny) -> PyResult<()> {
    for attr in [
        "__name__",
        "__qualname__",
        "__doc__",
        "__module__",
        "__annotations__",
        "__dict__",
        "__wrapped__",
    ] {
        if let Ok(value) = original.getattr(attr) {
            let _ = new_func.setattr(attr, value);
        }
    }
    Ok(())
}

fn rewrite_and_compile<'py>(
    py: Python<'py>,
    func: &'py PyAny,
    verbose_errors: bool,
) -> PyResult<PyObject> {
    let inspect = py.import("inspect")?;
    let raw_source: String = inspect.call_method1("getsource", (func,))?.extract()?;
    let source = dedent(&raw_source);
    let qualname: String = func.getattr("__qualname__")?.extract()?;

    let config = Config::new().with_verbose_errors(verbose_errors);
    let decorated = tco_core::decorate(&source, &qualname, DECORATOR_NAME, &config)
        .map_err(tco_error_to_py)?;
    let rewritten_source = decorated.pretty_print();

    let namespace = PyDict::new(py);
    if let Ok(globals) = func.getattr("__globals__") {
        if let Ok(globals) = globals.downcast::<PyDict>() {
            for (k, v) in globals.iter() {
                namespace.set_item(k, v)?;
            }
        }
    }

    // Closure cells already populated at decoration time (the common case
    // of a self-referencing recursive closure) resolve here; unpopulated
    // ones are left for the globals lookup at call time, same as the
    // original function would.
    if let Ok(code) = func.getattr("__code__") {
        if let (Ok(freevars), Ok(closure)) =
            (code.getattr("co_freevars"), func.getattr("__closure__"))
        {
            if !closure.is_none() {
                if let (Ok(freevars), Ok(closure)) = (
                    freevars.downcast::<PyTuple>(),
                    closure.downcast::<PyTuple>(),
                ) {
                    for (name, cell) in freevars.iter().zip(closure.iter()) {
                        if let Ok(contents) = cell.getattr("cell_contents") {
                            namespace.set_item(name, contents)?;
                        }
                    }
                }
            }
        }
    }

    py.run(&rewritten_source, Some(namespace), None).map_err(|e| {
        PySyntaxError::new_err(format!("failed to compile rewritten function: {e}"))
    })?;

    let name = decorated.function.name.as_str();
    let new_func = namespace
        .get_item(name)?
        .ok_or_else(|| PyRuntimeError::new_err(format!("rewritten definition did not bind `{name}`")))?;

    copy_metadata(func, new_func)?;
    Ok(new_func.into())
}

#[pyfunction]
#[pyo3(signature = (func=None, *, verbose_errors=false))]
fn optimize(py: Python<'_>, func: Option<&PyAny>, verbose_errors: bool) -> PyResult<PyObject> {
    match func {
        Some(f) => rewrite_and_compile(py, f, verbose_errors),
        None => Ok(Py::new(py, OptimizePartial { verbose_errors })?.into_py(py)),
    }
}

/// Returned when `optimize` is used in its called form (`@optimize()` /
/// `@optimize(verbose_errors=True)`) — a one-shot callable that applies the
/// decorator with the bound keyword arguments to whatever function it
/// receives next.
#[pyclass]
struct OptimizePartial {
    verbose_errors: bool,
}

#[pymethods]
impl OptimizePartial {
    fn __call__<'py>(&self, py: Python<'py>, func: &'py PyAny) -> PyResult<PyObject> {
        rewrite_and_compile(py, func, self.verbose_errors)
    }
}

#[pyfunction]
fn pretty_print(py: Python<'_>, func: &PyAny) -> PyResult<String> {
    let inspect = py.import("inspect")?;
    let raw_source: String = inspect.call_method1("getsource", (func,))?.extract()?;
    let source = dedent(&raw_source);
    let qualname: String = func.getattr("__qualname__")?.extract()?;
    let decorated = tco_core::decorate(&source, &qualname, DECORATOR_NAME, &Config::default())
        .map_err(tco_error_to_py)?;
    Ok(decorated.pretty_print())
}

#[pymodule]
fn tco(py: Python, m: &PyModule) -> PyResult<()> {
    let _ = tracing_subscriber::fmt::try_init();

    m.add_function(wrap_pyfunction!(optimize, m)?)?;

    let debug = PyModule::new(py, "debug")?;
    debug.add_function(wrap_pyfunction!(pretty_print, debug)?)?;
    m.add_submodule(debug)?;

    Ok(())
}
