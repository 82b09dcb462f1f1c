pub mod dialogue;
pub mod file;
pub mod forward;
pub mod names;
pub mod reverse;
pub mod scan;
pub mod statements;

pub use dialogue::{Dialogue, LineShape};
pub use file::{TranslationEntry, TranslationFile};
pub use forward::{CommentPolicy, ConvertResult, FormatCheck, RpyToPoConverter};
pub use names::CharacterNames;
pub use reverse::PoToRpyConverter;
pub use scan::scan_translation_files;
pub use statements::{PersistedStatements, Statement, Statements};
