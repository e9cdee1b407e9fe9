//! The `docs.html` navigation page linking every (language, version) build.

use crate::engine::DocVersion;

fn display_language(code: &str) -> String {
    match code {
        "en" => "🇬🇧 English".to_string(),
        "zh" => "🇨🇳 中文".to_string(),
        "jp" => "🇯🇵 日本語".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Relative link to a tree's doxygen html output.
pub fn link(language: &str, version: &str) -> String {
    format!("./{}/v{}/build_sub/html/index.html", language, version)
}

/// Versions are listed newest first; unparseable ones sort last.
pub fn render(lib_name: &str, languages: &[String], versions: &[String]) -> String {
    let mut ordered: Vec<&String> = versions.iter().collect();
    ordered.sort_by_key(|v| std::cmp::Reverse(v.parse::<DocVersion>().ok()));

    let mut groups = String::new();
    for version in ordered {
        groups.push_str("    <div class=\"version-group\">\n");
        groups.push_str(&format!(
            "      <h2 class=\"version-title\">Version {}</h2>\n",
            version
        ));
        groups.push_str("      <ul class=\"lang-links\">\n");
        for language in languages {
            groups.push_str(&format!(
                "        <li><a href=\"{}\">{} - Version {}</a></li>\n",
                link(language, version),
                display_language(language),
                version
            ));
        }
        groups.push_str("      </ul>\n    </div>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{lib} documentation</title>
  <style>
    body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: #f4f6f9; color: #333; margin: 0; padding: 40px; }}
    .container {{ max-width: 800px; margin: auto; background: white; padding: 30px; border-radius: 12px; box-shadow: 0 6px 20px rgba(0, 0, 0, 0.1); }}
    h1 {{ text-align: center; color: #2c3e50; }}
    .version-title {{ color: #2980b9; border-bottom: 2px solid #3498db; display: inline-block; }}
    .lang-links {{ list-style: none; padding: 0; }}
    .lang-links a {{ display: block; padding: 14px 20px; margin: 12px 0; background: #ecf0f1; color: #2c3e50; text-decoration: none; border-radius: 8px; border-left: 4px solid #3498db; }}
    .lang-links a:hover {{ background: #3498db; color: white; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>📄 {lib} documentation</h1>
{groups}  </div>
</body>
</html>
"#,
        lib = lib_name,
        groups = groups
    )
}
