use std::path::Path;

use regex::Regex;

lazy_static::lazy_static! {
    /// Ordered season/episode patterns, first match wins. Matched against
    /// the file stem (extension already stripped).
    static ref REG_EPISODE: Vec<Regex> = vec![
        // "Anime Titel - S01E01 (German Dub)"
        Regex::new(r#"(?i)^(?P<t>.*?) - S(?P<s>\d+)E(?P<e>\d+) \((?P<l>.*?)\)"#).unwrap(),
        // "Anime Titel S01E01 German Dub"
        Regex::new(r#"(?i)^(?P<t>.*?) S(?P<s>\d+)E(?P<e>\d+) (?P<l>.+)$"#).unwrap(),
        // "Anime Titel Staffel 1 Episode 1 German"
        Regex::new(r#"(?i)^(?P<t>.*?) (?:Staffel|Season) (?P<s>\d+) (?:Episode|Folge) (?P<e>\d+) (?P<l>.+)$"#).unwrap(),
        // "Anime_Titel.S01E01.German"
        Regex::new(r#"(?i)^(?P<t>.+?)[._]S(?P<s>\d+)E(?P<e>\d+)[._](?P<l>.*)$"#).unwrap(),
    ];

    /// Movie patterns, season is always 0.
    static ref REG_MOVIE: Vec<Regex> = vec![
        // "Anime Titel - Movie 01 (German Dub)"
        Regex::new(r#"(?i)^(?P<t>.*?) - Movie (?P<e>\d+) \((?P<l>.*?)\)"#).unwrap(),
        // "Anime Titel Movie 01 German Dub", language optional
        Regex::new(r#"(?i)^(?P<t>.*?) Movie (?P<e>\d+)(?: (?P<l>.+))?$"#).unwrap(),
    ];
}

/// Language labels the scraper produces; filename inference only ever
/// yields one of these or "Unknown".
const KNOWN_LANGUAGES: [&str; 4] = ["German Dub", "German Sub", "English Sub", "English Dub"];

/// Episode information extracted from a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEpisode {
    pub title: String,
    /// 0 means movie / no season.
    pub season: u32,
    pub episode: u32,
    pub language: String,
}

/// Strips characters that are invalid in paths on at least one platform.
/// Applied both when indexing and when matching queries so that lookups
/// by raw scraped title line up with titles stored from filenames.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '&'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// The loose matching variants for a language label: literal, the three
/// punctuation spellings, and just the first token. The first-token
/// variant is deliberately imprecise ("German" matches both "German Dub"
/// and "German Sub"); historical filenames are too inconsistent to match
/// strictly.
pub fn language_variants(language: &str) -> Vec<String> {
    let first_word = language
        .split_whitespace()
        .next()
        .unwrap_or(language)
        .to_string();
    vec![
        language.to_string(),
        language.replace(' ', "."),
        language.replace(' ', "_"),
        language.replace(' ', "-"),
        first_word,
    ]
}

/// Scans the full path (not just the filename) for a known language label
/// or one of its punctuation variants. Falls back to "Unknown".
pub fn language_from_path(path: &Path) -> String {
    let haystack = path.to_string_lossy().to_lowercase();

    for language in KNOWN_LANGUAGES {
        for variant in language_variants(language) {
            if haystack.contains(&variant.to_lowercase()) {
                return language.to_string();
            }
        }
    }

    "Unknown".to_string()
}

/// Extracts (title, season, episode, language) from a file name.
///
/// Returns `None` when no pattern matches; that is the expected outcome
/// for non-episode files sitting in the same directory and is not an
/// error. `path` is only consulted for language inference when a pattern
/// matches without an explicit language group.
pub fn parse_filename(path: &Path) -> Option<ParsedEpisode> {
    let stem = path.file_stem()?.to_str()?;

    for regex in REG_EPISODE.iter() {
        if let Some(caps) = regex.captures(stem) {
            return build(&caps, path, false);
        }
    }

    for regex in REG_MOVIE.iter() {
        if let Some(caps) = regex.captures(stem) {
            return build(&caps, path, true);
        }
    }

    None
}

fn build(caps: &regex::Captures<'_>, path: &Path, movie: bool) -> Option<ParsedEpisode> {
    let title = sanitize_title(caps.name("t")?.as_str());
    if title.is_empty() {
        return None;
    }

    let season = if movie {
        0
    } else {
        caps.name("s")?.as_str().parse().ok()?
    };
    let episode = caps.name("e")?.as_str().parse().ok()?;

    let language = match caps.name("l").map(|m| m.as_str().trim()) {
        Some(lang) if !lang.is_empty() => lang.to_string(),
        _ => language_from_path(path),
    };

    Some(ParsedEpisode {
        title,
        season,
        episode,
        language,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> Option<ParsedEpisode> {
        parse_filename(Path::new(name))
    }

    #[test]
    fn parse_standard() {
        assert_eq!(
            parse("Demon Slayer - S01E05 (German Dub).mp4"),
            Some(ParsedEpisode {
                title: "Demon Slayer".to_string(),
                season: 1,
                episode: 5,
                language: "German Dub".to_string(),
            })
        );
    }

    #[test]
    fn parse_without_leading_zeros() {
        let parsed = parse("Demon Slayer - S1E5 (German Dub).mp4").unwrap();
        assert_eq!((parsed.season, parsed.episode), (1, 5));
    }

    #[test]
    fn parse_no_parentheses() {
        assert_eq!(
            parse("Attack on Titan S02E12 English Sub.mkv"),
            Some(ParsedEpisode {
                title: "Attack on Titan".to_string(),
                season: 2,
                episode: 12,
                language: "English Sub".to_string(),
            })
        );
    }

    #[test]
    fn parse_movie_is_season_zero() {
        assert_eq!(
            parse("One Piece - Movie 03 (German Sub).mp4"),
            Some(ParsedEpisode {
                title: "One Piece".to_string(),
                season: 0,
                episode: 3,
                language: "German Sub".to_string(),
            })
        );
    }

    #[test]
    fn parse_spelled_out_german() {
        let parsed = parse("Naruto Staffel 3 Folge 21 German Dub.mp4").unwrap();
        assert_eq!(parsed.title, "Naruto");
        assert_eq!((parsed.season, parsed.episode), (3, 21));
        assert_eq!(parsed.language, "German Dub");
    }

    #[test]
    fn parse_dot_separated() {
        let parsed = parse("Vinland_Saga.S01E24.German.Dub.mkv").unwrap();
        assert_eq!(parsed.title, "Vinland_Saga");
        assert_eq!((parsed.season, parsed.episode), (1, 24));
        assert_eq!(parsed.language, "German.Dub");
    }

    #[test]
    fn parse_movie_without_language_uses_path() {
        let parsed = parse_filename(Path::new("/anime/German Dub/Akira Movie 1.mp4")).unwrap();
        assert_eq!(parsed.title, "Akira");
        assert_eq!((parsed.season, parsed.episode), (0, 1));
        assert_eq!(parsed.language, "German Dub");
    }

    #[test]
    fn parse_rejects_plain_files() {
        assert_eq!(parse("cover.jpg"), None);
        assert_eq!(parse("notes.txt"), None);
        assert_eq!(parse("Some Random Video.mp4"), None);
    }

    #[test]
    fn parse_is_idempotent() {
        let name = "Demon Slayer - S01E05 (German Dub).mp4";
        assert_eq!(parse(name), parse(name));
    }

    #[test]
    fn language_from_path_punctuation_variants() {
        assert_eq!(
            language_from_path(Path::new("/x/Show.German.Dub/ep.mp4")),
            "German Dub"
        );
        assert_eq!(
            language_from_path(Path::new("/x/Show english_sub/ep.mp4")),
            "English Sub"
        );
        assert_eq!(language_from_path(Path::new("/x/plain/ep.mp4")), "Unknown");
    }

    #[test]
    fn language_from_path_first_word_only() {
        // Only the bare language name appears; inference resolves it to
        // the first label carrying that word.
        assert_eq!(
            language_from_path(Path::new("/anime/German/ep.mp4")),
            "German Dub"
        );
    }

    #[test]
    fn sanitize_strips_invalid_characters() {
        assert_eq!(sanitize_title("Re:Zero"), "ReZero");
        assert_eq!(sanitize_title("Fate/stay night "), "Fatestay night");
        assert_eq!(sanitize_title("K&R"), "KR");
    }

    #[test]
    fn variants_include_first_word() {
        let variants = language_variants("German Dub");
        assert_eq!(
            variants,
            vec![
                "German Dub".to_string(),
                "German.Dub".to_string(),
                "German_Dub".to_string(),
                "German-Dub".to_string(),
                "German".to_string(),
            ]
        );
    }
}
