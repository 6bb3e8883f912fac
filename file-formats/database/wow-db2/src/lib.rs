//! Schema-driven decoder for World of Warcraft WDB5 (DB2) client database tables.
//!
//! DB2 files store client-side tables such as maps, areas and display
//! information. Their on-disk columns can be narrower than the values they
//! hold, the row id may live outside the record, and rows can be published
//! again under another id through a copy table. This crate hides all of
//! that behind a [`TableSchema`]: the schema fixes the materialized record
//! layout once, and every decoded [`TableRecord`] is read through
//! bounds-checked typed accessors.
//!
//! # Examples
//!
//! ```
//! use wow_db2::{Db2Table, Db2Writer, FieldType, SchemaField, TableSchema, Value};
//!
//! let schema = TableSchema::new(
//!     "Example",
//!     vec![
//!         SchemaField::new("Name", FieldType::String),
//!         SchemaField::new_array("Flags", FieldType::Short, 2),
//!     ],
//!     None,
//!     None,
//!     0x0BAD_F00D,
//! )?;
//!
//! let mut writer = Db2Writer::new(&schema);
//! writer.add_row(7, vec!["Seven".into(), Value::Short(1), Value::Short(2)])?;
//! let bytes = writer.to_bytes()?;
//!
//! let table = Db2Table::from_bytes(&bytes, &schema)?;
//! let record = table.record(0).unwrap();
//! assert_eq!(record.id(), 7);
//! assert_eq!(record.get_string(0, 0)?, "Seven");
//! assert_eq!(record.get_u16(1, 1)?, 2);
//! # Ok::<(), wow_db2::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod header;
pub mod record;
pub mod schema;
pub mod stringblock;
pub mod table;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use header::{FieldStructure, TableFlags, Wdb5Header};
pub use record::TableRecord;
pub use schema::{FieldType, SchemaField, TableSchema};
pub use stringblock::StringBlock;
pub use table::Db2Table;
pub use types::{RecordCopy, StringRef};
pub use writer::{Db2Writer, Value};
