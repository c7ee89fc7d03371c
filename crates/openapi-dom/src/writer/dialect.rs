use crate::format::SpecVersion;
use crate::model::ComponentKind;

/// How `nullable` is spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullableForm {
    /// `x-nullable: true`
    Extension,
    /// `nullable: true`
    Keyword,
    /// `type: [<type>, "null"]`
    TypeArray,
}

/// Field presence and spelling for one wire dialect.
///
/// The writer is generic; everything that differs between dialects is a row here.
#[derive(Debug, Clone, Copy)]
pub struct DialectTable {
    pub version: SpecVersion,
    /// Root discriminator key and value, e.g. `("openapi", "3.0.1")`.
    pub discriminator: (&'static str, &'static str),
    /// Components live in flat root sections (`definitions`, `parameters`, ...).
    pub flat_components: bool,
    /// Servers are projected to `host`/`basePath`/`schemes`.
    pub host_and_base_path: bool,
    /// Request bodies are written as `body`/`formData` parameters.
    pub body_parameters: bool,
    /// `type: file` for binary form fields and response payloads.
    pub file_type: bool,
    pub nullable: NullableForm,
    /// `exclusiveMinimum`/`exclusiveMaximum` carry the bound instead of a flag.
    pub numeric_exclusive_bounds: bool,
    /// `discriminator` is the bare property name.
    pub discriminator_as_string: bool,
    pub combinators: bool,
    pub write_only: bool,
    pub pattern_properties: bool,
    pub schema_id: bool,
    pub json_schema_dialect: bool,
    pub webhooks: bool,
    pub info_summary: bool,
    pub license_identifier: bool,
    pub trace: bool,
    pub path_item_components: bool,
}

pub const SWAGGER_2_0: DialectTable = DialectTable {
    version: SpecVersion::V2_0,
    discriminator: ("swagger", "2.0"),
    flat_components: true,
    host_and_base_path: true,
    body_parameters: true,
    file_type: true,
    nullable: NullableForm::Extension,
    numeric_exclusive_bounds: false,
    discriminator_as_string: true,
    combinators: false,
    write_only: false,
    pattern_properties: false,
    schema_id: false,
    json_schema_dialect: false,
    webhooks: false,
    info_summary: false,
    license_identifier: false,
    trace: false,
    path_item_components: false,
};

pub const OPENAPI_3_0: DialectTable = DialectTable {
    version: SpecVersion::V3_0,
    discriminator: ("openapi", "3.0.1"),
    flat_components: false,
    host_and_base_path: false,
    body_parameters: false,
    file_type: false,
    nullable: NullableForm::Keyword,
    numeric_exclusive_bounds: false,
    discriminator_as_string: false,
    combinators: true,
    write_only: true,
    pattern_properties: false,
    schema_id: false,
    json_schema_dialect: false,
    webhooks: false,
    info_summary: false,
    license_identifier: false,
    trace: true,
    path_item_components: false,
};

pub const OPENAPI_3_1: DialectTable = DialectTable {
    version: SpecVersion::V3_1,
    discriminator: ("openapi", "3.1.0"),
    nullable: NullableForm::TypeArray,
    numeric_exclusive_bounds: true,
    pattern_properties: true,
    schema_id: true,
    json_schema_dialect: true,
    webhooks: true,
    info_summary: true,
    license_identifier: true,
    path_item_components: true,
    ..OPENAPI_3_0
};

impl DialectTable {
    pub fn for_version(version: SpecVersion) -> &'static DialectTable {
        match version {
            SpecVersion::V2_0 => &SWAGGER_2_0,
            SpecVersion::V3_0 => &OPENAPI_3_0,
            SpecVersion::V3_1 => &OPENAPI_3_1,
        }
    }

    /// Pointer prefix of a component section, or `None` when the dialect has
    /// nowhere to put that kind and its uses are written inline.
    pub fn section(&self, kind: ComponentKind) -> Option<String> {
        if self.flat_components {
            let section = match kind {
                ComponentKind::Schema => "definitions",
                ComponentKind::Parameter | ComponentKind::RequestBody => "parameters",
                ComponentKind::Response => "responses",
                ComponentKind::SecurityScheme => "securityDefinitions",
                ComponentKind::Header | ComponentKind::PathItem => return None,
            };
            return Some(section.to_string());
        }
        if kind == ComponentKind::PathItem && !self.path_item_components {
            return None;
        }
        Some(format!("components/{}", kind.section()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_sections_for_swagger() {
        assert_eq!(SWAGGER_2_0.section(ComponentKind::Schema).as_deref(), Some("definitions"));
        assert_eq!(
            SWAGGER_2_0.section(ComponentKind::RequestBody).as_deref(),
            Some("parameters")
        );
        assert_eq!(SWAGGER_2_0.section(ComponentKind::Header), None);
        assert_eq!(
            OPENAPI_3_0.section(ComponentKind::SecurityScheme).as_deref(),
            Some("components/securitySchemes")
        );
    }

    #[test]
    fn path_items_only_in_3_1() {
        assert_eq!(OPENAPI_3_0.section(ComponentKind::PathItem), None);
        assert_eq!(
            OPENAPI_3_1.section(ComponentKind::PathItem).as_deref(),
            Some("components/pathItems")
        );
        assert!(OPENAPI_3_1.trace && !SWAGGER_2_0.trace);
    }
}
