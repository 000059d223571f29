//! Path layout helpers for the one shared bucket (spec §4.2).
//!
//! ```text
//! <bucket>/stage-validate/<user_id>/<task_id>/{pdf,json,text,pdf_original_path}_document.<ext>
//! <bucket>/archive/<code_path_slug...>/<process_slug>/<required_doc_slug>/<task_id>/{principal.pdf, original.pdf, metadata.json, extracted.txt}
//! <bucket>/system-templates/<uuid>.<ext>
//! <bucket>/system-templates/archive/<ts>_<old>.<ext>
//! ```

/// Lowercase, non-alphanumeric runs collapse to a single `-`, leading and
/// trailing `-` trimmed; an all-punctuation or empty input becomes `na`
/// (spec §4.2 slug rule).
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_dash = false;
    for ch in input.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn stage_path(user_id: &str, task_id: &str, artifact_key: &str, ext: &str) -> String {
    format!("stage-validate/{user_id}/{task_id}/{artifact_key}_document.{ext}")
}

/// `<code_path_slug...>/<process_slug>/<required_doc_slug>/<task_id>/` —
/// `code_path_segments` are the already-resolved `name_code`/`code_path`
/// hierarchy segments, slugged and joined in order.
pub fn archive_prefix(
    code_path_segments: &[&str],
    process_name: &str,
    required_doc_name: &str,
    task_id: &str,
) -> String {
    let mut segments: Vec<String> = code_path_segments.iter().map(|s| slug(s)).collect();
    segments.push(slug(process_name));
    segments.push(slug(required_doc_name));
    segments.push(task_id.to_string());
    format!("archive/{}", segments.join("/"))
}

pub fn archive_path(archive_prefix: &str, artifact: &str) -> String {
    format!("{archive_prefix}/{artifact}")
}

pub fn system_template_path(uuid: &str, ext: &str) -> String {
    format!("system-templates/{uuid}.{ext}")
}

pub fn system_template_archive_path(timestamp: &str, old_name: &str) -> String {
    format!("system-templates/archive/{timestamp}_{old_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_punctuation_and_lowercases() {
        assert_eq!(slug("Tecnologías de la Información"), "tecnolog-as-de-la-informaci-n");
        assert_eq!(slug("CS-101"), "cs-101");
    }

    #[test]
    fn slug_of_empty_or_punctuation_only_is_na() {
        assert_eq!(slug(""), "na");
        assert_eq!(slug("---"), "na");
    }

    #[test]
    fn archive_prefix_joins_segments_in_order() {
        let prefix = archive_prefix(&["ENG", "CS"], "Admission", "Transcript", "T1");
        assert_eq!(prefix, "archive/eng/cs/admission/transcript/T1");
    }
}
