//! Emits the Rust bindings and the C layout probe from the struct IDL.

use std::fmt::Write;

use crate::idl::{ComputedLayout, EnumDef, FieldType, Idl, StructDef};

const GENERATED_BANNER: &str =
    "Generated by build.rs from build_support/structs.json. Do not edit manually.";

/// `LoadOp` -> `LOAD_OP`
fn screaming_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}

fn probe_symbol(def: &StructDef) -> String {
    format!("wgpuj_probe_{}", def.c_name)
}

pub fn rust_bindings(idl: &Idl, layouts: &[ComputedLayout]) -> String {
    let mut out = String::new();
    writeln!(out, "// {}", GENERATED_BANNER).unwrap();
    writeln!(out).unwrap();

    for def in &idl.enums {
        write_enum(&mut out, def);
    }
    for (def, layout) in idl.structs.iter().zip(layouts) {
        write_struct(&mut out, &idl.header, def, layout);
    }
    write_registry(&mut out, idl);

    out
}

fn write_enum(out: &mut String, def: &EnumDef) {
    let c_name = &def.c_name;
    let rust_name = &def.rust_name;

    writeln!(out, "/// `{}` tag as stored in native structs.", c_name).unwrap();
    writeln!(out, "///").unwrap();
    writeln!(
        out,
        "/// The wrapped integer is written to native memory as-is; values outside"
    )
    .unwrap();
    writeln!(out, "/// the named constants are not checked.").unwrap();
    writeln!(out, "#[repr(transparent)]").unwrap();
    writeln!(
        out,
        "#[derive(Clone, Copy, PartialEq, Eq, Hash, bytemuck::Zeroable)]"
    )
    .unwrap();
    writeln!(out, "pub struct {}(pub u32);", c_name).unwrap();
    writeln!(out).unwrap();

    writeln!(out, "impl {} {{", c_name).unwrap();
    for variant in &def.variants {
        writeln!(
            out,
            "    pub const {}: Self = Self({});",
            screaming_case(&variant.name),
            variant.value
        )
        .unwrap();
    }
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "impl core::fmt::Debug for {} {{", c_name).unwrap();
    writeln!(
        out,
        "    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {{"
    )
    .unwrap();
    writeln!(out, "        match {}::try_from(*self) {{", rust_name).unwrap();
    writeln!(
        out,
        "            Ok(value) => write!(f, \"{}::{{:?}}\", value),",
        c_name
    )
    .unwrap();
    writeln!(
        out,
        "            Err(_) => write!(f, \"{}({{}})\", self.0),",
        c_name
    )
    .unwrap();
    writeln!(out, "        }}").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "/// Closed set of `{}` values.", c_name).unwrap();
    writeln!(out, "#[repr(u32)]").unwrap();
    writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]").unwrap();
    writeln!(out, "pub enum {} {{", rust_name).unwrap();
    for variant in &def.variants {
        writeln!(out, "    {} = {},", variant.name, variant.value).unwrap();
    }
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "impl From<{}> for {} {{", rust_name, c_name).unwrap();
    writeln!(out, "    fn from(value: {}) -> Self {{", rust_name).unwrap();
    writeln!(out, "        Self(value as u32)").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "impl TryFrom<{}> for {} {{", c_name, rust_name).unwrap();
    writeln!(out, "    type Error = crate::ffi::UnknownTag;").unwrap();
    writeln!(out).unwrap();
    writeln!(
        out,
        "    fn try_from(tag: {}) -> Result<Self, Self::Error> {{",
        c_name
    )
    .unwrap();
    writeln!(out, "        match tag.0 {{").unwrap();
    for variant in &def.variants {
        writeln!(
            out,
            "            {} => Ok({}::{}),",
            variant.value, rust_name, variant.name
        )
        .unwrap();
    }
    writeln!(
        out,
        "            value => Err(crate::ffi::UnknownTag {{ enum_name: \"{}\", value }}),",
        c_name
    )
    .unwrap();
    writeln!(out, "        }}").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();
}

fn write_struct(out: &mut String, header: &str, def: &StructDef, layout: &ComputedLayout) {
    let name = &def.c_name;

    if let Some(doc) = &def.doc {
        writeln!(out, "/// {}", doc).unwrap();
        writeln!(out, "///").unwrap();
    }
    writeln!(out, "/// Mirrors `{}` from `{}`.", name, header).unwrap();
    writeln!(out, "#[repr(C)]").unwrap();
    writeln!(out, "#[derive(Clone, Copy, bytemuck::Zeroable)]").unwrap();
    writeln!(out, "pub struct {} {{", name).unwrap();
    for field in &def.fields {
        writeln!(out, "    {}: {},", field.name, field.ty.rust_type()).unwrap();
    }
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(
        out,
        "static_assertions::const_assert_eq!(core::mem::size_of::<{}>(), {});",
        name, layout.size
    )
    .unwrap();
    writeln!(
        out,
        "static_assertions::const_assert_eq!(core::mem::align_of::<{}>(), {});",
        name, layout.align
    )
    .unwrap();
    for (field, offset) in def.fields.iter().zip(&layout.offsets) {
        writeln!(
            out,
            "static_assertions::const_assert_eq!(core::mem::offset_of!({}, {}), {});",
            name, field.name, offset
        )
        .unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "impl {} {{", name).unwrap();
    writeln!(
        out,
        "    /// Creates a zeroed instance by value. Values move, so pass"
    )
    .unwrap();
    writeln!(
        out,
        "    /// [`Self::create_direct`] instances to native code instead."
    )
    .unwrap();
    writeln!(out, "    pub fn create_heap() -> Self {{").unwrap();
    writeln!(out, "        <Self as bytemuck::Zeroable>::zeroed()").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out).unwrap();
    writeln!(
        out,
        "    /// Creates a zeroed instance in direct memory with a stable address."
    )
    .unwrap();
    writeln!(
        out,
        "    pub fn create_direct() -> Result<crate::Direct<Self>, crate::AllocError> {{"
    )
    .unwrap();
    writeln!(out, "        crate::Direct::new()").unwrap();
    writeln!(out, "    }}").unwrap();

    for (field, offset) in def.fields.iter().zip(&layout.offsets) {
        let field_name = &field.name;
        let ty = field.ty.rust_type();
        writeln!(out).unwrap();
        writeln!(out, "    //").unwrap();
        writeln!(out, "    // member : {}", field_name).unwrap();
        writeln!(out, "    // offset : {}", offset).unwrap();
        writeln!(out, "    //").unwrap();
        writeln!(out, "    pub fn {}(&self) -> {} {{", field_name, ty).unwrap();
        writeln!(out, "        self.{}", field_name).unwrap();
        writeln!(out, "    }}").unwrap();
        writeln!(out).unwrap();
        match &field.ty {
            FieldType::Enum(_) => {
                writeln!(
                    out,
                    "    pub fn set_{}(&mut self, value: impl Into<{}>) {{",
                    field_name, ty
                )
                .unwrap();
                writeln!(out, "        self.{} = value.into();", field_name).unwrap();
            }
            _ => {
                writeln!(
                    out,
                    "    pub fn set_{}(&mut self, value: {}) {{",
                    field_name, ty
                )
                .unwrap();
                writeln!(out, "        self.{} = value;", field_name).unwrap();
            }
        }
        writeln!(out, "    }}").unwrap();
    }
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "impl core::fmt::Debug for {} {{", name).unwrap();
    writeln!(
        out,
        "    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {{"
    )
    .unwrap();
    writeln!(out, "        f.debug_struct(\"{}\")", name).unwrap();
    for field in &def.fields {
        writeln!(
            out,
            "            .field(\"{}\", &self.{})",
            field.name, field.name
        )
        .unwrap();
    }
    writeln!(out, "            .finish()").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    let symbol = probe_symbol(def);
    let words = 2 + def.fields.len();
    writeln!(out, "extern \"C\" {{").unwrap();
    writeln!(out, "    fn {}(out: *mut usize);", symbol).unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "impl crate::layout::NativeStruct for {} {{", name).unwrap();
    writeln!(
        out,
        "    const LAYOUT: &'static crate::layout::StructLayout = &crate::layout::StructLayout {{"
    )
    .unwrap();
    writeln!(out, "        name: \"{}\",", name).unwrap();
    writeln!(out, "        size: core::mem::size_of::<{}>(),", name).unwrap();
    writeln!(out, "        align: core::mem::align_of::<{}>(),", name).unwrap();
    writeln!(out, "        fields: &[").unwrap();
    for field in &def.fields {
        writeln!(out, "            crate::layout::FieldLayout {{").unwrap();
        writeln!(out, "                name: \"{}\",", field.name).unwrap();
        writeln!(
            out,
            "                offset: core::mem::offset_of!({}, {}),",
            name, field.name
        )
        .unwrap();
        writeln!(
            out,
            "                size: core::mem::size_of::<{}>(),",
            field.ty.rust_type()
        )
        .unwrap();
        writeln!(out, "                kind: {},", field.ty.kind_expr()).unwrap();
        writeln!(out, "            }},").unwrap();
    }
    writeln!(out, "        ],").unwrap();
    writeln!(out, "    }};").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "    fn probe_native() -> crate::layout::ProbedLayout {{").unwrap();
    writeln!(out, "        let mut words = [0usize; {}];", words).unwrap();
    writeln!(
        out,
        "        // SAFETY: the probe writes size, align and one offset per field."
    )
    .unwrap();
    writeln!(out, "        unsafe {{ {}(words.as_mut_ptr()) }};", symbol).unwrap();
    writeln!(
        out,
        "        crate::layout::ProbedLayout::from_words(&words)"
    )
    .unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();
}

fn write_registry(out: &mut String, idl: &Idl) {
    writeln!(out, "/// Layouts of every generated struct, in declaration order.").unwrap();
    writeln!(
        out,
        "pub static LAYOUTS: &[&crate::layout::StructLayout] = &["
    )
    .unwrap();
    for def in &idl.structs {
        writeln!(
            out,
            "    <{} as crate::layout::NativeStruct>::LAYOUT,",
            def.c_name
        )
        .unwrap();
    }
    writeln!(out, "];").unwrap();
    writeln!(out).unwrap();

    writeln!(
        out,
        "/// Checks every generated struct against the compiled header."
    )
    .unwrap();
    writeln!(
        out,
        "pub fn verify_all() -> Result<(), crate::layout::LayoutError> {{"
    )
    .unwrap();
    for def in &idl.structs {
        writeln!(out, "    crate::layout::verify::<{}>()?;", def.c_name).unwrap();
    }
    writeln!(out, "    Ok(())").unwrap();
    writeln!(out, "}}").unwrap();
}

pub fn c_probe(idl: &Idl) -> String {
    let mut out = String::new();
    writeln!(out, "/* {} */", GENERATED_BANNER).unwrap();
    writeln!(out).unwrap();
    writeln!(out, "#include <stddef.h>").unwrap();
    writeln!(out, "#include \"{}\"", idl.header).unwrap();
    writeln!(out).unwrap();
    writeln!(out, "#if defined(_MSC_VER)").unwrap();
    writeln!(out, "#define WGPUJ_ALIGNOF(type) __alignof(type)").unwrap();
    writeln!(out, "#else").unwrap();
    writeln!(out, "#define WGPUJ_ALIGNOF(type) _Alignof(type)").unwrap();
    writeln!(out, "#endif").unwrap();

    for def in &idl.structs {
        writeln!(out).unwrap();
        writeln!(out, "void {}(size_t *out) {{", probe_symbol(def)).unwrap();
        writeln!(out, "    out[0] = sizeof({});", def.c_name).unwrap();
        writeln!(out, "    out[1] = WGPUJ_ALIGNOF({});", def.c_name).unwrap();
        for (i, field) in def.fields.iter().enumerate() {
            writeln!(
                out,
                "    out[{}] = offsetof({}, {});",
                i + 2,
                def.c_name,
                field.name
            )
            .unwrap();
        }
        writeln!(out, "}}").unwrap();
    }

    out
}
