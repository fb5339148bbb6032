//! The compiled artifact of one source file.

use std::cell::Cell;
use std::ops::Range;
use std::path::PathBuf;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::function::{BytecodeStorage, Function};
use crate::runtime::class::ClassInterface;
use crate::value::Value;

/// One constant-pool slot: a directly materialised value, or a byte
/// range into the flat data buffer for constants whose heap form is
/// built lazily (strings).
#[derive(Debug)]
pub struct DataVal {
    /// The value, `nil` for lazily materialised slots.
    pub value: Value,
    /// Backing bytes in [`ProgramData::data_buf`].
    pub backing: Option<Range<usize>>,
}

/// Attributes a bytecode range of one function to a source offset.
#[derive(Debug, Clone, Copy)]
pub struct SourceMapEntry {
    /// First covered bytecode offset.
    pub bc_from: usize,
    /// One past the last covered bytecode offset.
    pub bc_to: usize,
    /// Byte offset of the originating statement in the source.
    pub source_start: usize,
    /// Function the range belongs to.
    pub func_idx: usize,
}

/// One `import` statement.
#[derive(Debug)]
pub struct Import {
    /// Path as written, `./`-relative.
    pub path: String,
    /// Alias slot in [`ProgramData::imported_modules`], if `as` was used.
    pub module_idx: Option<usize>,
}

/// Name stubs recorded for one `import … as alias`.
///
/// The parser appends importer entries / reserved constant slots as
/// `alias::name` uses appear; executing the import fills them in.
#[derive(Debug, Default)]
pub struct ImportedModule {
    /// `alias::fn` → importer entry in this module's function table.
    pub fn_map: HashMap<String, usize>,
    /// `alias::CONST` → reserved slot in this module's constant pool.
    pub const_map: HashMap<String, usize>,
}

/// Everything the parser produces for one module except the main
/// function's code.
#[derive(Debug)]
pub struct ProgramData {
    /// Flat function table.
    pub fns: Vec<Function>,
    /// Function name → index.
    pub fn_map: HashMap<String, usize>,
    /// Function names by index, for diagnostics.
    pub fn_names: Vec<String>,
    /// Constant pool.
    pub data_vals: Vec<DataVal>,
    /// Flat backing buffer for string constants.
    pub data_buf: Vec<u8>,
    /// Import table, in `IMPORT` operand order.
    pub imports: Vec<Import>,
    /// Module alias → slot in [`Self::imported_modules`].
    pub imported_module_map: HashMap<String, usize>,
    /// Per-alias name stubs.
    pub imported_modules: Vec<ImportedModule>,
    /// Class table.
    pub classes: Vec<Rc<ClassInterface>>,
    /// Class name → index.
    pub class_map: HashMap<String, usize>,
    /// Exported constant name → pool slot.
    pub exported_consts: HashMap<String, usize>,
    /// Statement-level source map, grouped by function.
    pub source_map: Vec<SourceMapEntry>,
    /// Originating file, if parsed from one.
    pub file: Option<PathBuf>,
    /// Directory `./` imports resolve against.
    pub cwd: PathBuf,
    /// Source text, kept for error excerpts.
    pub source: String,
    /// Offset of this module's slots in the interpreter's constant
    /// cache; assigned when the module is registered.
    pub tl_constant_start: Cell<usize>,
}

impl ProgramData {
    /// An empty module rooted at `cwd`.
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            fns: Vec::new(),
            fn_map: HashMap::new(),
            fn_names: Vec::new(),
            data_vals: Vec::new(),
            data_buf: Vec::new(),
            imports: Vec::new(),
            imported_module_map: HashMap::new(),
            imported_modules: Vec::new(),
            classes: Vec::new(),
            class_map: HashMap::new(),
            exported_consts: HashMap::new(),
            source_map: Vec::new(),
            file: None,
            cwd,
            source: String::new(),
            tl_constant_start: Cell::new(0),
        }
    }

    /// Intern a directly materialised constant.
    pub fn add_data(&mut self, value: Value) -> usize {
        self.data_vals.push(DataVal {
            value,
            backing: None,
        });
        self.data_vals.len() - 1
    }

    /// Intern a string constant backed by raw bytes; the heap form is
    /// materialised lazily through the interpreter's constant cache.
    pub fn add_string_data(&mut self, bytes: &[u8]) -> usize {
        let start = self.data_buf.len();
        self.data_buf.extend_from_slice(bytes);
        self.data_vals.push(DataVal {
            value: Value::None,
            backing: Some(start..self.data_buf.len()),
        });
        self.data_vals.len() - 1
    }

    /// Name of a function, for diagnostics.
    pub fn fn_name(&self, idx: usize) -> &str {
        self.fn_names.get(idx).map_or("(anonymous)", |s| s.as_str())
    }

    /// Source offset attributed to `pc` within function `func_idx`.
    pub fn source_pos(&self, func_idx: usize, pc: usize) -> Option<usize> {
        self.source_map
            .iter()
            .find(|entry| entry.func_idx == func_idx && entry.bc_from <= pc && pc < entry.bc_to)
            .map(|entry| entry.source_start)
    }
}

/// A parsed program: top-level code plus its module data.
#[derive(Debug)]
pub struct Program {
    /// The top-level ("main") function.
    pub main: BytecodeStorage,
    /// Everything else.
    pub data: Rc<ProgramData>,
}
