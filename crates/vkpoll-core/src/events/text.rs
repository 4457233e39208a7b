/// Turn the escaped text VK delivers into what the user typed.
///
/// Line breaks arrive as literal `<br>` and are not themselves escaped, so they
/// are replaced first; `&amp;` goes last so `&amp;lt;` stays `&lt;`.
pub fn normalize_text(text: &str) -> String {
    text.replace("<br>", "\n")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
