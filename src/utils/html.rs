/// Sanitizes author-supplied text before it is stored in the catalog.
///
/// Quiz names, descriptions, instructions and question text are rendered by
/// participant clients, so markup is whitelisted through ammonia: safe tags
/// such as <b> survive, <script> and event attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

pub fn clean_all(items: &[String]) -> Vec<String> {
    items.iter().map(|item| clean_html(item)).collect()
}
