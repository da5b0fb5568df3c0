// Copyright 2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

/// Checks that tags are balanced and all entities are known. Returns the names of all root
/// elements. This is not a full XML parser, but it covers everything the renderer emits.
pub fn xml_root_elements(doc: &str) -> Result<Vec<String>, String> {
    let mut stack: Vec<String> = Vec::new();
    let mut roots = Vec::new();
    let mut rest = doc;
    while let Some(start) = rest.find('<') {
        check_entities(&rest[..start])?;
        let end = rest[start..]
            .find('>')
            .map(|e| start + e)
            .ok_or_else(|| format!("unterminated tag at: {}", &rest[start..]))?;
        let tag = &rest[start + 1..end];
        rest = &rest[end + 1..];

        if tag.starts_with('?') || tag.starts_with('!') {
            // prolog or comment
            continue;
        }
        if let Some(name) = tag.strip_prefix('/') {
            match stack.pop() {
                Some(open) if open == name.trim() => {}
                other => return Err(format!("closing `{name}` does not match {other:?}")),
            }
            continue;
        }
        check_entities(tag)?;
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .ok_or_else(|| "empty tag".to_string())?
            .to_string();
        if stack.is_empty() {
            roots.push(name.clone());
        }
        if !self_closing {
            stack.push(name);
        }
    }
    check_entities(rest)?;
    if !rest.trim().is_empty() {
        return Err(format!("trailing text: {rest}"));
    }
    if !stack.is_empty() {
        return Err(format!("unclosed elements: {stack:?}"));
    }
    Ok(roots)
}

fn check_entities(text: &str) -> Result<(), String> {
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        rest = &rest[pos..];
        let known = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"]
            .iter()
            .any(|e| rest.starts_with(e));
        if !known {
            return Err(format!("unknown entity at: {rest}"));
        }
        rest = &rest[1..];
    }
    Ok(())
}

/// Panics unless the document has exactly one `svg` root element.
pub fn assert_single_svg_root(svg: &[u8]) {
    let text = std::str::from_utf8(svg).expect("svg must be valid utf-8");
    let roots = xml_root_elements(text).unwrap_or_else(|e| panic!("malformed svg: {e}"));
    assert_eq!(roots, ["svg"]);
}
