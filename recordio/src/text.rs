//! Newline-delimited text replies.

/// Iterates over the non-blank lines of a reply body, trimmed.
pub fn lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines().map(str::trim).filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_drops_blank_lines() {
        let body = "setosa\r\nversicolor\n\n  virginica  \n";
        let got: Vec<_> = lines(body).collect();
        assert_eq!(got, vec!["setosa", "versicolor", "virginica"]);
    }
}
