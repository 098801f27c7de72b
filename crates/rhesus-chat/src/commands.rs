//! User input -> model prompt.

use rhesus_common::ChatMessage;
use serde::Deserialize;

const TITLE_CHARS: usize = 40;

/// A text file uploaded with a message (PDB files in practice).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    /// Ask for a search-grounded answer.
    pub web_search: bool,
}

/// `/fetchblast <jobId>` re-attaches to an existing BLAST job.
pub fn fetch_blast_job_id(content: &str) -> Option<&str> {
    content
        .trim()
        .strip_prefix("/fetchblast ")
        .and_then(|rest| rest.split_whitespace().next())
}

/// Build the prompt sent to the model, or `None` when there is nothing to send.
pub fn build_prompt(content: &str, attachment: Option<&Attachment>, reply_to: Option<&ChatMessage>) -> Option<Prompt> {
    let mut prompt = Prompt { text: content.to_string(), web_search: false };
    if let Some(file) = attachment {
        prompt.text = format!("Analyze this uploaded PDB file: {}", file.text);
    }
    if prompt.text.starts_with('/') {
        prompt = expand_slash_command(&prompt.text);
    }
    if let Some(target) = reply_to {
        prompt.text = format!("In reply to \"{}\", {}", target.raw_content, prompt.text);
    }
    if prompt.text.trim().is_empty() {
        return None;
    }
    Some(prompt)
}

/// Unknown commands pass through unchanged.
fn expand_slash_command(command: &str) -> Prompt {
    let (cmd, arg) = command.split_once(' ').unwrap_or((command, ""));
    let (text, web_search) = match cmd {
        "/visualize" => (format!("Show me the 3D structure for PDB ID {}", arg), false),
        "/blast" => (format!("Run a BLAST search for the following: {}", arg), false),
        "/search" => (format!("Search the web for: {}", arg), true),
        _ => (command.to_string(), false),
    };
    Prompt { text, web_search }
}

/// Recent-chat title: the first 40 characters, with an ellipsis when cut.
pub fn recent_title(prompt: &str) -> String {
    let mut title: String = prompt.chars().take(TITLE_CHARS).collect();
    if prompt.chars().count() > TITLE_CHARS {
        title.push_str("...");
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhesus_common::MessageAuthor;

    fn prompt(content: &str) -> Option<Prompt> {
        build_prompt(content, None, None)
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(prompt("/visualize 4HHB").unwrap().text, "Show me the 3D structure for PDB ID 4HHB");
        assert_eq!(
            prompt("/blast MALWMRLLPL").unwrap().text,
            "Run a BLAST search for the following: MALWMRLLPL"
        );
        let search = prompt("/search CRISPR base editing 2024").unwrap();
        assert_eq!(search.text, "Search the web for: CRISPR base editing 2024");
        assert!(search.web_search);
        assert_eq!(prompt("/unknown thing").unwrap().text, "/unknown thing");
    }

    #[test]
    fn test_attachment_and_reply() {
        let file = Attachment { name: "1crn.pdb".into(), text: "HEADER CRAMBIN".into() };
        let target = ChatMessage::new("m1", MessageAuthor::Rhesus, "Insulin has two chains.");
        let p = build_prompt("", Some(&file), Some(&target)).unwrap();
        assert_eq!(
            p.text,
            "In reply to \"Insulin has two chains.\", Analyze this uploaded PDB file: HEADER CRAMBIN"
        );
    }

    #[test]
    fn test_blank_input_is_ignored() {
        assert_eq!(prompt("   "), None);
        assert_eq!(prompt(""), None);
    }

    #[test]
    fn test_fetch_blast_parsing() {
        assert_eq!(fetch_blast_job_id(" /fetchblast ncbiblast-R1 extra"), Some("ncbiblast-R1"));
        assert_eq!(fetch_blast_job_id("/fetchblast "), None);
        assert_eq!(fetch_blast_job_id("/fetchblastX"), None);
    }

    #[test]
    fn test_recent_title() {
        assert_eq!(recent_title("short"), "short");
        let long = "Show me the 3D structure for PDB ID 4HHB please";
        assert_eq!(recent_title(long), "Show me the 3D structure for PDB ID 4HHB...");
    }
}
