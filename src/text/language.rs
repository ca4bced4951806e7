use whatlang::Info;

/// Detects the language of a text as an ISO-639-1 code (or `"unknown"`)
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> String;
}

/// Language code returned when no language can be determined
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Trigram language identification via `whatlang`.
///
/// Detections whatlang itself flags as unreliable (short titles, code
/// identifiers, mixed-language text) come back as [`UNKNOWN_LANGUAGE`].
#[derive(Debug, Clone, Default)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    pub fn new() -> Self {
        Self
    }

    fn code(info: &Info) -> String {
        let code = info.lang().code();
        iso_639_1(code).unwrap_or(code).to_string()
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> String {
        match whatlang::detect(text) {
            Some(info) if info.is_reliable() => Self::code(&info),
            Some(info) => {
                tracing::debug!(
                    lang = info.lang().code(),
                    confidence = info.confidence(),
                    "Unreliable language detection"
                );
                UNKNOWN_LANGUAGE.to_string()
            }
            None => UNKNOWN_LANGUAGE.to_string(),
        }
    }
}

/// Two-letter code for whatlang's ISO-639-3 codes; others pass through
fn iso_639_1(code: &str) -> Option<&'static str> {
    let short = match code {
        "eng" => "en",
        "deu" => "de",
        "fra" => "fr",
        "spa" => "es",
        "ita" => "it",
        "nld" => "nl",
        "por" => "pt",
        "rus" => "ru",
        "ukr" => "uk",
        "pol" => "pl",
        "ces" => "cs",
        "slk" => "sk",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "nb",
        "fin" => "fi",
        "hun" => "hu",
        "ron" => "ro",
        "tur" => "tr",
        "ell" => "el",
        "bul" => "bg",
        "hrv" => "hr",
        "srp" => "sr",
        "slv" => "sl",
        "lit" => "lt",
        "lav" => "lv",
        "est" => "et",
        "cat" => "ca",
        "ara" => "ar",
        "heb" => "he",
        "pes" => "fa",
        "hin" => "hi",
        "ben" => "bn",
        "cmn" => "zh",
        "jpn" => "ja",
        "kor" => "ko",
        "vie" => "vi",
        "tha" => "th",
        "ind" => "id",
        "epo" => "eo",
        _ => return None,
    };
    Some(short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_english_issue() {
        let detector = WhatlangDetector::new();
        assert_eq!(
            detector.detect(
                "The application crashes every time I click the submit button on the settings \
                 page. Steps to reproduce: open the settings, change any value and press save."
            ),
            "en"
        );
    }

    #[test]
    fn test_detects_german_issue() {
        let detector = WhatlangDetector::new();
        assert_eq!(
            detector.detect(
                "Die Anwendung stürzt jedes Mal ab, wenn ich auf der Einstellungsseite den \
                 Knopf zum Speichern drücke. Danach funktioniert gar nichts mehr."
            ),
            "de"
        );
    }

    #[test]
    fn test_detects_spanish_issue() {
        let detector = WhatlangDetector::new();
        assert_eq!(
            detector.detect(
                "La aplicación se cierra cada vez que hago clic en el botón de guardar en la \
                 página de configuración. Después de eso ya no funciona nada."
            ),
            "es"
        );
    }

    #[test]
    fn test_english_with_foreign_looking_words_is_not_rejected() {
        let detector = WhatlangDetector::new();
        for text in [
            "Crash with de-DE locale Dates render wrong",
            "Die roll animation freezes Clicking roll again hangs",
            "Support para element Markdown renderer drops tags",
        ] {
            let detected = detector.detect(text);
            assert!(
                detected == "en" || detected == UNKNOWN_LANGUAGE,
                "{:?} detected as {}",
                text,
                detected
            );
        }
    }

    #[test]
    fn test_non_alphabetic_text_is_unknown() {
        let detector = WhatlangDetector::new();
        assert_eq!(detector.detect("1234 5678 !!!"), UNKNOWN_LANGUAGE);
        assert_eq!(detector.detect(""), UNKNOWN_LANGUAGE);
    }

    #[test]
    fn test_three_letter_codes_map_to_two() {
        assert_eq!(iso_639_1("eng"), Some("en"));
        assert_eq!(iso_639_1("cmn"), Some("zh"));
        assert_eq!(iso_639_1("xyz"), None);
    }
}
