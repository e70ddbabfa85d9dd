//! protobuf::printer
//!
//! Rendering file descriptors back to `.proto` text.
//!
//! # Design
//!
//! The output is deterministic for a given descriptor: declarations appear
//! in descriptor order and every message or enum type reference is written
//! fully qualified with a leading dot, so the text parses the same way no
//! matter which file it is placed next to.
//!
//! Supported: proto2 and proto3 files with imports, common file options,
//! messages (labels, proto3 `optional`, maps, oneofs, reserved ranges and
//! names, extension ranges, nested types), enums, extensions and services.
//! Groups and editions files are rejected.

use prost_reflect::FileDescriptor;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto,
};

use super::ProtoError;

/// Highest field number; `max` in reserved and extension ranges.
const MAX_FIELD_NUMBER: i32 = 536_870_911;

/// Renders a file descriptor to schema text.
pub trait SchemaPrinter: Send + Sync {
    /// Render `file` to `.proto` text.
    fn print(&self, file: &FileDescriptor) -> Result<String, ProtoError>;
}

/// Printer producing `.proto` source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoPrinter;

impl ProtoPrinter {
    /// Create a printer.
    pub fn new() -> Self {
        Self
    }

    /// Render a raw file descriptor proto.
    pub fn print_proto(&self, file: &FileDescriptorProto) -> Result<String, ProtoError> {
        let syntax = match file.syntax() {
            "" | "proto2" => Syntax::Proto2,
            "proto3" => Syntax::Proto3,
            other => {
                return Err(ProtoError::SchemaRender {
                    file: file.name().to_string(),
                    message: format!("unsupported syntax '{}'", other),
                })
            }
        };

        let mut renderer = Renderer {
            file: file.name(),
            syntax,
            out: String::new(),
            depth: 0,
        };
        renderer.file(file)?;
        Ok(renderer.out)
    }
}

impl SchemaPrinter for ProtoPrinter {
    fn print(&self, file: &FileDescriptor) -> Result<String, ProtoError> {
        self.print_proto(file.file_descriptor_proto())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Proto2,
    Proto3,
}

struct Renderer<'a> {
    file: &'a str,
    syntax: Syntax,
    out: String,
    depth: usize,
}

impl Renderer<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn error(&self, message: String) -> ProtoError {
        ProtoError::SchemaRender {
            file: self.file.to_string(),
            message,
        }
    }

    fn file(&mut self, file: &FileDescriptorProto) -> Result<(), ProtoError> {
        match self.syntax {
            Syntax::Proto2 => self.line("syntax = \"proto2\";"),
            Syntax::Proto3 => self.line("syntax = \"proto3\";"),
        }

        if !file.package().is_empty() {
            self.blank();
            self.line(&format!("package {};", file.package()));
        }

        if !file.dependency.is_empty() {
            self.blank();
            for (i, dep) in file.dependency.iter().enumerate() {
                let i = i as i32;
                let modifier = if file.public_dependency.contains(&i) {
                    "public "
                } else if file.weak_dependency.contains(&i) {
                    "weak "
                } else {
                    ""
                };
                self.line(&format!("import {}{};", modifier, quote(dep)));
            }
        }

        let options = file_options(file);
        if !options.is_empty() {
            self.blank();
            for option in options {
                self.line(&format!("option {};", option));
            }
        }

        let scope = if file.package().is_empty() {
            String::new()
        } else {
            format!(".{}", file.package())
        };

        for enumeration in &file.enum_type {
            self.blank();
            self.enumeration(enumeration);
        }

        for message in &file.message_type {
            self.blank();
            self.message(message, &scope)?;
        }

        for (extendee, fields) in group_by_extendee(&file.extension) {
            self.blank();
            self.extend(extendee, &fields)?;
        }

        for service in &file.service {
            self.blank();
            self.service(service);
        }

        Ok(())
    }

    fn message(&mut self, message: &DescriptorProto, scope: &str) -> Result<(), ProtoError> {
        let full_name = format!("{}.{}", scope, message.name());

        self.line(&format!("message {} {{", message.name()));
        self.depth += 1;
        let mut started = false;

        if message
            .options
            .as_ref()
            .map_or(false, |options| options.deprecated())
        {
            self.line("option deprecated = true;");
            started = true;
        }

        if !message.reserved_range.is_empty() {
            let ranges: Vec<String> = message
                .reserved_range
                .iter()
                .map(|r| range(r.start(), r.end() - 1, MAX_FIELD_NUMBER))
                .collect();
            self.line(&format!("reserved {};", ranges.join(", ")));
            started = true;
        }

        if !message.reserved_name.is_empty() {
            let names: Vec<String> = message.reserved_name.iter().map(|n| quote(n)).collect();
            self.line(&format!("reserved {};", names.join(", ")));
            started = true;
        }

        // Nested messages follow the descriptor's nested-type order. A map
        // field is printed where its entry sits in that order, since parsers
        // synthesize the entry at the map field's position.
        let mut after_block = false;
        for enumeration in &message.enum_type {
            if started {
                self.blank();
            }
            self.enumeration(enumeration);
            started = true;
            after_block = true;
        }

        let mut printed_maps = vec![false; message.field.len()];
        for nested in &message.nested_type {
            if is_map_entry(nested) {
                let entry_name = format!("{}.{}", full_name, nested.name());
                let Some(index) = message
                    .field
                    .iter()
                    .position(|f| f.label() == Label::Repeated && qualify(f.type_name()) == entry_name)
                else {
                    return Err(self.error(format!("map entry '{}' has no map field", entry_name)));
                };
                if after_block {
                    self.blank();
                }
                let text = self.field(&message.field[index], Some((message, full_name.as_str())), false)?;
                self.line(&text);
                printed_maps[index] = true;
                after_block = false;
            } else {
                if started {
                    self.blank();
                }
                self.message(nested, &full_name)?;
                after_block = true;
            }
            started = true;
        }

        let mut printed_oneofs = vec![false; message.oneof_decl.len()];
        for (position, field) in message.field.iter().enumerate() {
            if printed_maps[position] {
                continue;
            }
            if let Some(index) = real_oneof(field) {
                if printed_oneofs.get(index).copied().unwrap_or(true) {
                    continue;
                }
            }
            if after_block {
                self.blank();
                after_block = false;
            }
            match real_oneof(field) {
                Some(index) => {
                    printed_oneofs[index] = true;
                    self.oneof(message, index, &full_name)?;
                }
                None => {
                    let text = self.field(field, Some((message, full_name.as_str())), false)?;
                    self.line(&text);
                }
            }
            started = true;
        }

        if !message.extension_range.is_empty() {
            let ranges: Vec<String> = message
                .extension_range
                .iter()
                .map(|r| range(r.start(), r.end() - 1, MAX_FIELD_NUMBER))
                .collect();
            self.line(&format!("extensions {};", ranges.join(", ")));
            started = true;
        }

        for (extendee, fields) in group_by_extendee(&message.extension) {
            if started {
                self.blank();
            }
            self.extend(extendee, &fields)?;
            started = true;
        }

        self.depth -= 1;
        self.line("}");
        Ok(())
    }

    fn oneof(
        &mut self,
        message: &DescriptorProto,
        index: usize,
        full_name: &str,
    ) -> Result<(), ProtoError> {
        let name = message.oneof_decl.get(index).map_or("", |o| o.name());
        self.line(&format!("oneof {} {{", name));
        self.depth += 1;
        for field in &message.field {
            if real_oneof(field) == Some(index) {
                let text = self.field(field, Some((message, full_name)), true)?;
                self.line(&text);
            }
        }
        self.depth -= 1;
        self.line("}");
        Ok(())
    }

    fn extend(&mut self, extendee: &str, fields: &[&FieldDescriptorProto]) -> Result<(), ProtoError> {
        self.line(&format!("extend {} {{", qualify(extendee)));
        self.depth += 1;
        for field in fields {
            let text = self.field(field, None, false)?;
            self.line(&text);
        }
        self.depth -= 1;
        self.line("}");
        Ok(())
    }

    /// Render one field declaration; `owner` enables map detection.
    fn field(
        &self,
        field: &FieldDescriptorProto,
        owner: Option<(&DescriptorProto, &str)>,
        in_oneof: bool,
    ) -> Result<String, ProtoError> {
        if field.r#type() == Type::Group {
            return Err(self.error(format!("field '{}' is a group", field.name())));
        }

        if let Some(entry) = owner.and_then(|(message, full_name)| map_entry(field, message, full_name)) {
            let key = entry.field.iter().find(|f| f.number() == 1);
            let value = entry.field.iter().find(|f| f.number() == 2);
            let (Some(key), Some(value)) = (key, value) else {
                return Err(self.error(format!("map field '{}' has a malformed entry", field.name())));
            };
            return Ok(format!(
                "map<{}, {}> {} = {}{};",
                type_name(key),
                type_name(value),
                field.name(),
                field.number(),
                self.field_options(field)
            ));
        }

        let label = if in_oneof {
            ""
        } else {
            match (field.label(), self.syntax) {
                (Label::Repeated, _) => "repeated ",
                (Label::Required, _) => "required ",
                (Label::Optional, Syntax::Proto2) => "optional ",
                (Label::Optional, Syntax::Proto3) if field.proto3_optional() => "optional ",
                (Label::Optional, Syntax::Proto3) => "",
            }
        };

        Ok(format!(
            "{}{} {} = {}{};",
            label,
            type_name(field),
            field.name(),
            field.number(),
            self.field_options(field)
        ))
    }

    fn field_options(&self, field: &FieldDescriptorProto) -> String {
        let mut options = Vec::new();

        if let Some(default) = &field.default_value {
            let value = match field.r#type() {
                Type::String => quote(default),
                // Bytes defaults are stored already escaped.
                Type::Bytes => format!("\"{}\"", default),
                _ => default.clone(),
            };
            options.push(format!("default = {}", value));
        }

        if let Some(field_options) = &field.options {
            if let Some(packed) = field_options.packed {
                options.push(format!("packed = {}", packed));
            }
            if field_options.deprecated() {
                options.push("deprecated = true".to_string());
            }
        }

        if options.is_empty() {
            String::new()
        } else {
            format!(" [{}]", options.join(", "))
        }
    }

    fn enumeration(&mut self, enumeration: &EnumDescriptorProto) {
        self.line(&format!("enum {} {{", enumeration.name()));
        self.depth += 1;

        if let Some(options) = &enumeration.options {
            if options.allow_alias() {
                self.line("option allow_alias = true;");
            }
            if options.deprecated() {
                self.line("option deprecated = true;");
            }
        }

        if !enumeration.reserved_range.is_empty() {
            let ranges: Vec<String> = enumeration
                .reserved_range
                .iter()
                .map(|r| range(r.start(), r.end(), i32::MAX))
                .collect();
            self.line(&format!("reserved {};", ranges.join(", ")));
        }

        if !enumeration.reserved_name.is_empty() {
            let names: Vec<String> = enumeration.reserved_name.iter().map(|n| quote(n)).collect();
            self.line(&format!("reserved {};", names.join(", ")));
        }

        for value in &enumeration.value {
            let deprecated = value
                .options
                .as_ref()
                .map_or(false, |options| options.deprecated());
            let suffix = if deprecated { " [deprecated = true]" } else { "" };
            self.line(&format!("{} = {}{};", value.name(), value.number(), suffix));
        }

        self.depth -= 1;
        self.line("}");
    }

    fn service(&mut self, service: &ServiceDescriptorProto) {
        self.line(&format!("service {} {{", service.name()));
        self.depth += 1;
        for method in &service.method {
            let client = if method.client_streaming() { "stream " } else { "" };
            let server = if method.server_streaming() { "stream " } else { "" };
            self.line(&format!(
                "rpc {}({}{}) returns ({}{});",
                method.name(),
                client,
                qualify(method.input_type()),
                server,
                qualify(method.output_type())
            ));
        }
        self.depth -= 1;
        self.line("}");
    }
}

fn file_options(file: &FileDescriptorProto) -> Vec<String> {
    let Some(options) = &file.options else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let strings = [
        ("java_package", &options.java_package),
        ("java_outer_classname", &options.java_outer_classname),
        ("go_package", &options.go_package),
        ("csharp_namespace", &options.csharp_namespace),
        ("objc_class_prefix", &options.objc_class_prefix),
        ("php_namespace", &options.php_namespace),
        ("ruby_package", &options.ruby_package),
        ("swift_prefix", &options.swift_prefix),
    ];
    for (name, value) in strings {
        if let Some(value) = value {
            lines.push(format!("{} = {}", name, quote(value)));
        }
    }

    let bools = [
        ("java_multiple_files", options.java_multiple_files),
        ("cc_enable_arenas", options.cc_enable_arenas),
        ("deprecated", options.deprecated),
    ];
    for (name, value) in bools {
        if let Some(value) = value {
            lines.push(format!("{} = {}", name, value));
        }
    }

    if options.optimize_for.is_some() {
        lines.push(format!("optimize_for = {}", options.optimize_for().as_str_name()));
    }

    lines
}

/// Index of the declared oneof a field belongs to; synthetic proto3
/// `optional` oneofs are not declared.
fn real_oneof(field: &FieldDescriptorProto) -> Option<usize> {
    if field.proto3_optional() {
        return None;
    }
    field.oneof_index.and_then(|i| usize::try_from(i).ok())
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message
        .options
        .as_ref()
        .map_or(false, |options| options.map_entry())
}

fn map_entry<'m>(
    field: &FieldDescriptorProto,
    message: &'m DescriptorProto,
    full_name: &str,
) -> Option<&'m DescriptorProto> {
    if field.label() != Label::Repeated || field.r#type() != Type::Message {
        return None;
    }
    let type_name = qualify(field.type_name());
    message
        .nested_type
        .iter()
        .find(|nested| is_map_entry(nested) && format!("{}.{}", full_name, nested.name()) == type_name)
}

fn group_by_extendee(fields: &[FieldDescriptorProto]) -> Vec<(&str, Vec<&FieldDescriptorProto>)> {
    let mut groups: Vec<(&str, Vec<&FieldDescriptorProto>)> = Vec::new();
    for field in fields {
        match groups.iter_mut().find(|(extendee, _)| *extendee == field.extendee()) {
            Some((_, members)) => members.push(field),
            None => groups.push((field.extendee(), vec![field])),
        }
    }
    groups
}

fn type_name(field: &FieldDescriptorProto) -> String {
    let scalar = match field.r#type() {
        Type::Message | Type::Enum | Type::Group => return qualify(field.type_name()),
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
    };
    scalar.to_string()
}

fn qualify(name: &str) -> String {
    if name.starts_with('.') {
        name.to_string()
    } else {
        format!(".{}", name)
    }
}

fn range(start: i32, end: i32, max: i32) -> String {
    if start == end {
        start.to_string()
    } else if end == max {
        format!("{} to max", start)
    } else {
        format!("{} to {}", start, end)
    }
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\x{:02x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
