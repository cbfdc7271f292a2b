// src/common/slug.rs

/// Gera um slug ASCII: minúsculas, acentos removidos, separadores viram '-'.
/// "Home & Garden" -> "home-garden", "Eletrônicos" -> "eletronicos".
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(ch);
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else if folded == '\'' || folded == '"' {
            // apóstrofos somem: "Men's" -> "mens"
            continue;
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_separators() {
        assert_eq!(slugify("Home & Garden"), "home-garden");
        assert_eq!(slugify("  Smart   Phones  "), "smart-phones");
    }

    #[test]
    fn folds_accents_and_drops_apostrophes() {
        assert_eq!(slugify("Eletrônicos e Informática"), "eletronicos-e-informatica");
        assert_eq!(slugify("Men's Clothing"), "mens-clothing");
    }

    #[test]
    fn symbols_only_yield_empty_slug() {
        assert_eq!(slugify("!!!"), "");
    }
}
