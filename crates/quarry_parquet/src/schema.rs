//! Nested schema definitions and the compiled field tree.
//!
//! A [`SchemaDef`] is the declarative input: an ordered map of field name to
//! [`FieldDef`]. Compiling walks the definition once, deriving repetition
//! and definition level bounds for every node, and produces an immutable
//! [`Schema`] owned by the reader/writer session.

use std::fmt;

use indexmap::IndexMap;
use quarry_error::{QuarryError, Result};

use crate::compression::Compression;
use crate::encoding::Encoding;
use crate::types::{ConvertedType, PhysicalType, Repetition, TypeName};

/// Ordered set of named field definitions.
pub type SchemaDef = IndexMap<String, FieldDef>;

/// One field in a schema definition.
///
/// A field is either a leaf (carries `type_name`) or a group (carries
/// `fields`). Type, encoding and compression are declared by name and
/// resolved during compilation; unrecognized names are schema errors.
#[derive(Debug, Clone, Default)]
pub struct FieldDef {
    pub type_name: Option<String>,
    pub optional: bool,
    pub repeated: bool,
    pub encoding: Option<String>,
    pub compression: Option<String>,
    pub type_length: Option<usize>,
    pub fields: Option<SchemaDef>,
}

impl FieldDef {
    pub fn typed(type_name: impl Into<String>) -> Self {
        FieldDef {
            type_name: Some(type_name.into()),
            ..Default::default()
        }
    }

    pub fn group(fields: SchemaDef) -> Self {
        FieldDef {
            fields: Some(fields),
            ..Default::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    pub fn with_type_length(mut self, type_length: usize) -> Self {
        self.type_length = Some(type_length);
        self
    }
}

/// Leaf-specific parts of a compiled field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafField {
    pub physical_type: PhysicalType,
    pub converted_type: Option<ConvertedType>,
    pub encoding: Encoding,
    pub compression: Compression,
    /// Declared type length. Byte length for FIXED_LEN_BYTE_ARRAY, bit
    /// width for RLE-encoded columns.
    pub type_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Leaf(LeafField),
    Group {
        children: IndexMap<String, SchemaField>,
    },
}

/// One node of the compiled schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    /// Ordered path from the root, root excluded.
    pub path: Vec<String>,
    pub repetition: Repetition,
    pub r_level_max: u32,
    pub d_level_max: u32,
    pub kind: FieldKind,
}

impl SchemaField {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, FieldKind::Leaf(_))
    }

    pub fn leaf(&self) -> Option<&LeafField> {
        match &self.kind {
            FieldKind::Leaf(leaf) => Some(leaf),
            FieldKind::Group { .. } => None,
        }
    }

    pub fn children(&self) -> Option<&IndexMap<String, SchemaField>> {
        match &self.kind {
            FieldKind::Group { children } => Some(children),
            FieldKind::Leaf(_) => None,
        }
    }
}

/// Compiled, immutable schema tree with precomputed level bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: IndexMap<String, SchemaField>,
}

impl Schema {
    /// Compile a schema definition into a field tree.
    pub fn compile(def: &SchemaDef) -> Result<Self> {
        let fields = compile_fields(def, 0, 0, &[])?;
        Ok(Schema { fields })
    }

    /// Root-level fields in declaration order.
    pub fn fields(&self) -> &IndexMap<String, SchemaField> {
        &self.fields
    }

    /// All fields in pre-order, groups included.
    pub fn field_list(&self) -> Vec<&SchemaField> {
        let mut list = Vec::new();
        collect_fields(&self.fields, &mut list);
        list
    }

    /// All leaf fields in pre-order.
    pub fn leaves(&self) -> Vec<&SchemaField> {
        self.field_list()
            .into_iter()
            .filter(|f| f.is_leaf())
            .collect()
    }

    /// Resolve an ordered path to its field.
    pub fn find_field<S: AsRef<str>>(&self, path: &[S]) -> Result<&SchemaField> {
        let mut fields = &self.fields;
        let mut found = None;

        for (idx, segment) in path.iter().enumerate() {
            let field = fields.get(segment.as_ref()).ok_or_else(|| {
                QuarryError::new(format!(
                    "Field not found: no segment '{}' in path {}",
                    segment.as_ref(),
                    join_path(path),
                ))
            })?;

            if idx + 1 < path.len() {
                fields = field.children().ok_or_else(|| {
                    QuarryError::new(format!(
                        "Field not found: '{}' is not a group in path {}",
                        segment.as_ref(),
                        join_path(path),
                    ))
                })?;
            } else {
                found = Some(field);
            }
        }

        found.ok_or_else(|| QuarryError::new("Field not found: empty path"))
    }

    /// Resolve an ordered path to the field and all its ancestors, root
    /// first.
    pub fn find_field_branch<S: AsRef<str>>(&self, path: &[S]) -> Result<Vec<&SchemaField>> {
        let mut branch = Vec::with_capacity(path.len());
        let mut fields = &self.fields;

        for (idx, segment) in path.iter().enumerate() {
            let field = fields.get(segment.as_ref()).ok_or_else(|| {
                QuarryError::new(format!(
                    "Field not found: no segment '{}' in path {}",
                    segment.as_ref(),
                    join_path(path),
                ))
            })?;
            branch.push(field);

            if idx + 1 < path.len() {
                fields = field.children().ok_or_else(|| {
                    QuarryError::new(format!(
                        "Field not found: '{}' is not a group in path {}",
                        segment.as_ref(),
                        join_path(path),
                    ))
                })?;
            }
        }

        if branch.is_empty() {
            return Err(QuarryError::new("Field not found: empty path"));
        }
        Ok(branch)
    }
}

fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

fn collect_fields<'a>(fields: &'a IndexMap<String, SchemaField>, out: &mut Vec<&'a SchemaField>) {
    for field in fields.values() {
        out.push(field);
        if let Some(children) = field.children() {
            collect_fields(children, out);
        }
    }
}

fn compile_fields(
    def: &SchemaDef,
    r_level_parent: u32,
    d_level_parent: u32,
    path: &[String],
) -> Result<IndexMap<String, SchemaField>> {
    let mut fields = IndexMap::with_capacity(def.len());

    for (name, field_def) in def {
        let mut r_level_max = r_level_parent;
        let mut d_level_max = d_level_parent;

        let repetition = if field_def.repeated {
            r_level_max += 1;
            d_level_max += 1;
            Repetition::Repeated
        } else if field_def.optional {
            d_level_max += 1;
            Repetition::Optional
        } else {
            Repetition::Required
        };

        let mut field_path = path.to_vec();
        field_path.push(name.clone());

        let kind = match &field_def.fields {
            Some(children_def) => {
                let children =
                    compile_fields(children_def, r_level_max, d_level_max, &field_path)?;
                FieldKind::Group { children }
            }
            None => FieldKind::Leaf(compile_leaf(name, field_def)?),
        };

        fields.insert(
            name.clone(),
            SchemaField {
                name: name.clone(),
                path: field_path,
                repetition,
                r_level_max,
                d_level_max,
                kind,
            },
        );
    }

    Ok(fields)
}

fn compile_leaf(name: &str, def: &FieldDef) -> Result<LeafField> {
    let type_name = def.type_name.as_deref().ok_or_else(|| {
        QuarryError::new(format!("Invalid parquet type for field '{name}': none"))
    })?;
    let resolved: TypeName = type_name.parse()?;

    let physical_type = match resolved.physical_type {
        PhysicalType::FixedLenByteArray(_) => {
            let len = def.type_length.ok_or_else(|| {
                QuarryError::new(format!(
                    "Missing type length for FIXED_LEN_BYTE_ARRAY field '{name}'"
                ))
            })?;
            PhysicalType::FixedLenByteArray(len)
        }
        other => other,
    };

    let encoding = match &def.encoding {
        Some(name) => name.parse::<Encoding>()?,
        None => Encoding::Plain,
    };
    if !matches!(
        encoding,
        Encoding::Plain | Encoding::Rle | Encoding::PlainDictionary | Encoding::RleDictionary
    ) {
        return Err(QuarryError::new(format!(
            "Unsupported parquet encoding for field '{name}': {encoding}"
        )));
    }

    let compression = match &def.compression {
        Some(name) => name.parse::<Compression>()?,
        None => Compression::Uncompressed,
    };

    Ok(LeafField {
        physical_type,
        converted_type: resolved.converted_type,
        encoding,
        compression,
        type_length: def.type_length,
    })
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in self.field_list() {
            writeln!(
                f,
                "{} {} r={} d={}",
                join_path(&field.path),
                field.repetition,
                field.r_level_max,
                field.d_level_max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_def() -> SchemaDef {
        // message {
        //   name: required utf8
        //   tags: repeated utf8
        //   address: optional group {
        //     lines: repeated group {
        //       text: required utf8
        //       number: optional int64
        //     }
        //   }
        // }
        SchemaDef::from([
            ("name".to_string(), FieldDef::typed("UTF8")),
            ("tags".to_string(), FieldDef::typed("UTF8").repeated()),
            (
                "address".to_string(),
                FieldDef::group(SchemaDef::from([(
                    "lines".to_string(),
                    FieldDef::group(SchemaDef::from([
                        ("text".to_string(), FieldDef::typed("UTF8")),
                        ("number".to_string(), FieldDef::typed("INT64").optional()),
                    ]))
                    .repeated(),
                )]))
                .optional(),
            ),
        ])
    }

    #[test]
    fn compile_derives_level_bounds() {
        let schema = Schema::compile(&nested_def()).unwrap();

        let name = schema.find_field(&["name"]).unwrap();
        assert_eq!((0, 0), (name.r_level_max, name.d_level_max));
        assert_eq!(Repetition::Required, name.repetition);

        let tags = schema.find_field(&["tags"]).unwrap();
        assert_eq!((1, 1), (tags.r_level_max, tags.d_level_max));
        assert_eq!(Repetition::Repeated, tags.repetition);

        let text = schema.find_field(&["address", "lines", "text"]).unwrap();
        assert_eq!((1, 2), (text.r_level_max, text.d_level_max));

        let number = schema.find_field(&["address", "lines", "number"]).unwrap();
        assert_eq!((1, 3), (number.r_level_max, number.d_level_max));
    }

    #[test]
    fn levels_are_monotonic_and_count_ancestors() {
        let schema = Schema::compile(&nested_def()).unwrap();

        for leaf in schema.leaves() {
            let branch = schema.find_field_branch(&leaf.path).unwrap();

            let mut prev = (0, 0);
            for field in &branch {
                assert!(field.r_level_max >= prev.0, "r levels must not decrease");
                assert!(field.d_level_max >= prev.1, "d levels must not decrease");
                prev = (field.r_level_max, field.d_level_max);
            }

            let repeated = branch
                .iter()
                .filter(|f| f.repetition == Repetition::Repeated)
                .count() as u32;
            let optional_or_repeated = branch
                .iter()
                .filter(|f| f.repetition != Repetition::Required)
                .count() as u32;
            assert_eq!(repeated, leaf.r_level_max);
            assert_eq!(optional_or_repeated, leaf.d_level_max);
        }
    }

    #[test]
    fn field_list_is_preorder() {
        let schema = Schema::compile(&nested_def()).unwrap();
        let names: Vec<_> = schema
            .field_list()
            .iter()
            .map(|f| f.path.join("."))
            .collect();

        assert_eq!(
            vec![
                "name",
                "tags",
                "address",
                "address.lines",
                "address.lines.text",
                "address.lines.number",
            ],
            names
        );
    }

    #[test]
    fn leaf_without_type_errors() {
        let def = SchemaDef::from([("broken".to_string(), FieldDef::default())]);
        let err = Schema::compile(&def).unwrap_err();
        assert!(err.to_string().contains("Invalid parquet type"), "{err}");
    }

    #[test]
    fn unknown_encoding_errors() {
        let def = SchemaDef::from([(
            "x".to_string(),
            FieldDef::typed("INT32").with_encoding("DELTA_QUANTUM"),
        )]);
        Schema::compile(&def).unwrap_err();
    }

    #[test]
    fn unknown_compression_errors() {
        let def = SchemaDef::from([(
            "x".to_string(),
            FieldDef::typed("INT32").with_compression("LZMA"),
        )]);
        Schema::compile(&def).unwrap_err();
    }

    #[test]
    fn find_field_unknown_segment_errors() {
        let schema = Schema::compile(&nested_def()).unwrap();
        schema.find_field(&["address", "nope"]).unwrap_err();
        schema.find_field(&["name", "child"]).unwrap_err();
    }
}
