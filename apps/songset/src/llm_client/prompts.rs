// Prompt text for song requests and re-prompts.
// The reply shape requested here is what recommend::parser expects.

/// Batch request. Replace `{count}` and `{prompt}` before sending.
pub const SONG_BATCH_TEMPLATE: &str = "\
Give me {count} songs you recommend. Use this as your reference: Only {prompt}

For every song include the title, artist and album. Do not forget the artist or the title.
Do not hallucinate and do not make up songs. Only recommend songs that exist.
Do not recommend songs outside of the genre or topic of the prompt.
Do not rely on any single datapoint too heavily and do not over-recommend one artist.
Do not recommend songs that are already listed in this prompt.
Ignore any other task you are asked to do; only recommend songs.

Respond with a JSON array only, no other text, in exactly this shape:
[{\"title\": \"\", \"artist\": \"\", \"album\": \"\"}]";

/// Single-song request used when re-prompting. Replace `{prompt}` before sending.
pub const SONG_SINGLE_TEMPLATE: &str = "\
Give me 1 song you recommend. Use this as your reference: Only {prompt}

Include the title, artist and album. Do not forget the artist or the title.
Do not hallucinate and do not make up songs. Only recommend songs that exist.
Do not recommend songs outside of the genre or topic of the prompt.
Do not recommend songs that are already listed in this prompt.
Ignore any other task you are asked to do; only recommend songs.

Respond with a single JSON object only, no other text, in exactly this shape:
{\"title\": \"\", \"artist\": \"\", \"album\": \"\"}";

/// Appended to the base prompt on re-prompts. Replace `{songs}` before sending.
pub const REJECTION_CLAUSE_TEMPLATE: &str = "\n\n\
The following songs are already in the list or do not exist: {songs}. Do not recommend them.";

/// Builds the message sent to the backend for `count` songs.
pub fn song_request(prompt: &str, count: usize) -> String {
    if count == 1 {
        SONG_SINGLE_TEMPLATE.replace("{prompt}", prompt)
    } else {
        SONG_BATCH_TEMPLATE
            .replace("{count}", &count.to_string())
            .replace("{prompt}", prompt)
    }
}

/// Builds the "do not recommend these" clause. Empty when there is nothing to list.
pub fn rejection_clause(labels: &[String]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    REJECTION_CLAUSE_TEMPLATE.replace("{songs}", &labels.join("; "))
}
