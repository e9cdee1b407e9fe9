//! Annotation conventions, printed by `splice guide`.

use crate::config::ProjectConfig;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Topic {
    Docs,
    Modules,
}

pub fn docs_guide(config: &ProjectConfig) -> String {
    let languages = config.docs.languages.join(", ");
    format!(
        "\
Documentation annotations
  1. One functional unit (a lone f.hpp, or f.hpp with f.cpp) shares one namespace.
  2. The file-level comment opens with /*! and holds @file, then
     '@defgroup tag alias' exactly once; alias matches the unit's namespace.
  3. Do not write @{{ or @}}: the group is opened and closed for you.
  4. Separate top-level objects with exactly 3 blank lines.
  5. Document each object in a /** ... */ comment with '@since <version>'.
     A header '@since' newer than the built version drops the whole file
     (and its .c/.cpp counterpart).
  6. Tag translated text with a language marker: ' * @brief [zh] ...'.
     The block runs until the next ' * @' line without a marker and must end
     before the comment does. Configured languages: {languages}.
  7. Images: prefix IN for doxygen only, OUT for sphinx only, anything else
     goes to both.
"
    )
}

pub fn modules_guide(config: &ProjectConfig) -> String {
    let marker = &config.modules.marker;
    format!(
        "\
Module annotations
  1. Separate top-level objects with exactly 2 blank lines.
  2. Wrap the #include lines at the top of each file between
     // {marker}::ImportStart and // {marker}::ImportEnd.
  3. With [modules].generate_inplace = true, `splice modules` writes one
     .{suffix} unit beside each .{def} file.
  4. [modules].std_modules turn #include <name> into import <name>;
  5. [modules].user_modules turn #include \"name.{decl}\" into import \"name.{decl}\";
     every other include is kept as // {marker}::Escape <line>.
  6. ' * @exporter' in an object's /** ... */ comment exports the object.
  7. ' * @attacher' attaches the object to the unit without exporting it.
  8. .h/.c hold C, .{decl}/.{def} hold C++.
",
        suffix = config.modules.module_suffix,
        def = config.modules.definition_suffix,
        decl = config.modules.declaration_suffix,
    )
}

pub fn render(config: &ProjectConfig, topic: Option<Topic>) -> String {
    match topic {
        Some(Topic::Docs) => docs_guide(config),
        Some(Topic::Modules) => modules_guide(config),
        None => format!("{}\n{}", docs_guide(config), modules_guide(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guides_reflect_configuration() {
        let mut config = ProjectConfig::default();
        config.modules.marker = "Acme".into();
        config.docs.languages = vec!["en".into(), "jp".into()];
        let text = render(&config, None);
        assert!(text.contains("// Acme::ImportStart"));
        assert!(text.contains("Configured languages: en, jp."));
        assert!(text.contains("Do not write @{ or @}"));
        assert!(!render(&config, Some(Topic::Docs)).contains("Module annotations"));
    }
}
