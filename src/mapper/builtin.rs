/// Names of the mapping tables compiled into the binary.
pub const BUILTIN_TABLES: &[&str] = &["matomo", "uap", "browscap"];

/// YAML source of a built-in mapping table.
pub fn builtin_table(name: &str) -> Option<&'static str> {
    match name {
        "matomo" => Some(include_str!("../../mappings/matomo.yml")),
        "uap" => Some(include_str!("../../mappings/uap.yml")),
        "browscap" => Some(include_str!("../../mappings/browscap.yml")),
        _ => None,
    }
}
