// src/utils/html.rs

/// Clean HTML content using the ammonia library.
///
/// Elaboration bodies and review answers come from a rich-text editor.
/// Safe tags (like <b>, <p>) are kept; dangerous tags (like <script>,
/// <iframe>) and attributes (like onclick) are stripped.
///
/// Note: <script> is removed together with its content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
