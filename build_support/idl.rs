//! Struct IDL read by the build script.
//!
//! The IDL mirrors the declarations of the native header: every struct lists
//! its fields in memory order, and layouts are computed with the C rules for
//! natural alignment.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Idl {
    pub header: String,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    pub structs: Vec<StructDef>,
}

#[derive(Debug, Deserialize)]
pub struct EnumDef {
    pub c_name: String,
    pub rust_name: String,
    pub variants: Vec<VariantDef>,
}

#[derive(Debug, Deserialize)]
pub struct VariantDef {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Deserialize)]
pub struct StructDef {
    pub c_name: String,
    #[serde(default)]
    pub doc: Option<String>,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FieldType {
    U32,
    F32,
    F64,
    Bool,
    Enum(String),
    Struct(String),
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if let Some(name) = value.strip_prefix("enum ") {
            return Ok(FieldType::Enum(name.trim().to_string()));
        }
        if let Some(name) = value.strip_prefix("struct ") {
            return Ok(FieldType::Struct(name.trim().to_string()));
        }
        match value {
            "u32" => Ok(FieldType::U32),
            "f32" => Ok(FieldType::F32),
            "f64" => Ok(FieldType::F64),
            "bool" => Ok(FieldType::Bool),
            other => Err(format!("unsupported field type `{}`", other)),
        }
    }
}

impl FieldType {
    /// Rust spelling of the field type inside the generated module.
    pub fn rust_type(&self) -> &str {
        match self {
            FieldType::U32 => "u32",
            FieldType::F32 => "f32",
            FieldType::F64 => "f64",
            FieldType::Bool => "bool",
            FieldType::Enum(name) | FieldType::Struct(name) => name,
        }
    }

    /// `crate::layout::FieldKind` expression for the field.
    pub fn kind_expr(&self) -> String {
        match self {
            FieldType::U32 => "crate::layout::FieldKind::U32".to_string(),
            FieldType::F32 => "crate::layout::FieldKind::F32".to_string(),
            FieldType::F64 => "crate::layout::FieldKind::F64".to_string(),
            FieldType::Bool => "crate::layout::FieldKind::Bool".to_string(),
            FieldType::Enum(name) => format!("crate::layout::FieldKind::Enum({:?})", name),
            FieldType::Struct(name) => format!("crate::layout::FieldKind::Struct({:?})", name),
        }
    }
}

/// C layout of one struct, fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedLayout {
    pub size: usize,
    pub align: usize,
    pub offsets: Vec<usize>,
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

pub fn load_idl(path: &Path) -> Result<Idl, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    let idl: Idl = serde_json::from_str(&json)?;
    Ok(idl)
}

impl Idl {
    pub fn find_enum(&self, c_name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|def| def.c_name == c_name)
    }

    /// Computes every struct's layout, rejecting references to unknown or
    /// not-yet-declared types.
    pub fn compute_layouts(&self) -> Result<Vec<ComputedLayout>, String> {
        let mut known: HashMap<&str, (usize, usize)> = HashMap::new();
        let mut layouts = Vec::with_capacity(self.structs.len());

        for def in &self.structs {
            if def.fields.is_empty() {
                return Err(format!("struct {} has no fields", def.c_name));
            }
            if known.contains_key(def.c_name.as_str()) {
                return Err(format!("struct {} is declared twice", def.c_name));
            }

            let mut offset = 0;
            let mut struct_align = 1;
            let mut offsets = Vec::with_capacity(def.fields.len());
            for field in &def.fields {
                let (size, align) = match &field.ty {
                    FieldType::U32 | FieldType::F32 => (4, 4),
                    FieldType::F64 => (8, 8),
                    FieldType::Bool => (1, 1),
                    // C enums are int-sized on every supported target.
                    FieldType::Enum(name) => {
                        if self.find_enum(name).is_none() {
                            return Err(format!(
                                "{}.{} refers to unknown enum {}",
                                def.c_name, field.name, name
                            ));
                        }
                        (4, 4)
                    }
                    FieldType::Struct(name) => *known.get(name.as_str()).ok_or_else(|| {
                        format!(
                            "{}.{} refers to struct {} before its declaration",
                            def.c_name, field.name, name
                        )
                    })?,
                };
                offset = align_up(offset, align);
                offsets.push(offset);
                offset += size;
                struct_align = struct_align.max(align);
            }

            let size = align_up(offset, struct_align);
            known.insert(def.c_name.as_str(), (size, struct_align));
            layouts.push(ComputedLayout {
                size,
                align: struct_align,
                offsets,
            });
        }

        Ok(layouts)
    }
}
