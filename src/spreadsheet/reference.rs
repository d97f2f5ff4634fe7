//! Conversions between spreadsheet coordinates (`D15`, column `H`, visual row 44)
//! and the 0-based (row, column) indexes used by `Sheet`.

/// Converts column letters to a 0-based index: `A` = 0, `Z` = 25, `AA` = 26.
///
/// Letters are case-insensitive. Returns `None` for empty input, any non-letter
/// character, or a column beyond `usize`.
pub fn column_letter_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut number = 0usize;
    for byte in letters.bytes() {
        if !byte.is_ascii_alphabetic() {
            return None;
        }
        let digit = (byte.to_ascii_uppercase() - b'A') as usize + 1;
        number = number.checked_mul(26)?.checked_add(digit)?;
    }
    Some(number - 1)
}

/// Converts a 0-based column index back to letters (26 -> `AA`).
pub fn index_to_column_letter(index: usize) -> String {
    let mut number = index + 1;
    let mut letters = Vec::<u8>::new();
    while number > 0 {
        number -= 1;
        letters.push(b'A' + (number % 26) as u8);
        number /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts a 1-based visual row number to a 0-based grid row. Row 0 does not exist.
pub fn to_zero_based_row(row: usize) -> Option<usize> {
    row.checked_sub(1)
}

/// Parses an A1-style reference into 0-based (row, column); `$` anchors are ignored.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference
        .find(|character: char| character.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = column_letter_to_index(letters)?;
    let row = to_zero_based_row(digits.parse::<usize>().ok()?)?;
    Some((row, col))
}

/// Formats 0-based (row, column) as an A1-style reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_column_letter(col), row + 1)
}
