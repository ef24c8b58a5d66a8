//! Extraction of the market-cap ranking table.
//!
//! The upstream page renders the ranking as `table.type_2`. Each data row has at
//! least seven cells: rank, name link, price, (unused), change, change percent,
//! and the remaining market columns. Rows with fewer cells are visual
//! separators. Numerals carry no sign; the direction is only visible through an
//! arrow icon in the change cell, so the sign is re-derived from that icon.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::{Snapshot, StockRow, MAX_RANK, SNAPSHOT_LIMIT};

const RANKING_ROWS: &str = "table.type_2 tbody tr";
const MIN_CELLS: usize = 7;

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(RANKING_ROWS).expect("ranking row selector is valid"));
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector is valid"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("img selector is valid"));
static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"code=(\d+)").expect("code pattern is valid"));

/// Direction of a price move as signalled by the arrow icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn apply(self, magnitude: i64) -> i64 {
        match self {
            Self::Positive => magnitude.saturating_abs(),
            Self::Negative => magnitude.saturating_abs().saturating_neg(),
        }
    }

    pub fn apply_f64(self, magnitude: f64) -> f64 {
        // No negative zero on the wire.
        if magnitude == 0.0 {
            return 0.0;
        }
        match self {
            Self::Positive => magnitude.abs(),
            Self::Negative => -magnitude.abs(),
        }
    }
}

/// Maps an icon path to a direction. `down` and `fall` both mean negative.
pub fn derive_sign(icon_path: &str) -> Direction {
    if icon_path.contains("down") || icon_path.contains("fall") {
        Direction::Negative
    } else {
        Direction::Positive
    }
}

/// Leading-integer parse over a thousands-separated numeral.
///
/// Accepts an optional sign followed by digits and ignores any trailing text,
/// so `"1,234원"` is `1234`. Returns `None` when no digits lead the text.
pub fn parse_int(text: &str) -> Option<i64> {
    let cleaned = strip_separators(text);
    let numeral = leading_numeral(&cleaned, false);
    numeral.parse().ok()
}

/// Leading-decimal parse, e.g. `"-1.23%"` is `-1.23`.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned = strip_separators(text);
    let numeral = leading_numeral(&cleaned, true);
    numeral.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn strip_separators(text: &str) -> String {
    text.trim().chars().filter(|ch| *ch != ',').collect()
}

fn leading_numeral(text: &str, allow_fraction: bool) -> &str {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut seen_dot = false;
    while let Some(&byte) = bytes.get(end) {
        match byte {
            b'0'..=b'9' => end += 1,
            b'.' if allow_fraction && !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    &text[..end]
}

/// Parses the ranking table out of decoded HTML.
///
/// Never fails: a missing table yields an empty snapshot, malformed rows are
/// skipped and unparsable numeric fields fall back to zero.
pub fn parse_ranking_table(html: &str) -> Snapshot {
    let document = Html::parse_document(html);
    let mut seen = BTreeSet::new();
    let mut rows = Vec::new();

    for element in document.select(&ROW_SELECTOR) {
        let Some(row) = parse_row(element) else {
            continue;
        };
        if !seen.insert(row.rank) {
            warn!(
                target: "kospi::crawl",
                rank = row.rank,
                company = %row.company_name,
                "duplicate rank kept"
            );
        }
        rows.push(row);
    }

    rows.truncate(SNAPSHOT_LIMIT);
    Snapshot::new(rows)
}

fn parse_row(row: ElementRef<'_>) -> Option<StockRow> {
    // Direct children only, so markup nested inside a cell cannot shift the indices.
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .collect();
    if cells.len() < MIN_CELLS {
        return None;
    }

    let rank = parse_int(&cell_text(cells[0]))
        .and_then(|rank| u32::try_from(rank).ok())
        .filter(|rank| (1..=MAX_RANK).contains(rank));
    let Some(rank) = rank else {
        debug!(target: "kospi::crawl", text = %cell_text(cells[0]), "row without rank skipped");
        return None;
    };

    let anchor = cells[1].select(&ANCHOR_SELECTOR).next();
    let company_name = anchor.map(cell_text).unwrap_or_default();
    let stock_code = anchor
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| CODE_PATTERN.captures(href))
        .and_then(|captures| captures.get(1))
        .map(|code| code.as_str().to_owned())
        .unwrap_or_default();

    // A negative price falls back to the default like any unparsable cell.
    let price = parse_int(&cell_text(cells[2]))
        .and_then(|price| u64::try_from(price).ok())
        .unwrap_or(0);
    let change = parse_int(&cell_text(cells[4])).unwrap_or(0);
    let change_pct = parse_decimal(&cell_text(cells[5])).unwrap_or(0.0);

    let icon = cells[4]
        .select(&IMG_SELECTOR)
        .next()
        .and_then(|img| img.value().attr("src"))
        .unwrap_or("");
    let direction = derive_sign(icon);

    Some(StockRow {
        rank,
        stock_code,
        company_name,
        price,
        change: direction.apply(change),
        change_pct: direction.apply_f64(change_pct),
    })
}

fn cell_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_html(rank: &str, code: &str, name: &str, icon: &str, change: &str, pct: &str) -> String {
        format!(
            r#"<tr>
<td class="no">{rank}</td>
<td><a href="/item/main.naver?code={code}" class="tltle">{name}</a></td>
<td class="number">71,500</td>
<td class="number">100</td>
<td class="number"><img src="{icon}" width="7" height="6" alt=""><span class="tah p11">{change}</span></td>
<td class="number"><span class="tah p11">{pct}</span></td>
<td class="number">4,268,379</td>
</tr>"#
        )
    }

    fn page(rows: &[String]) -> String {
        format!(
            r#"<html><body>
<table class="type_2"><thead><tr><th>N</th></tr></thead>
<tbody>
<tr><td class="blank_08" colspan="10"></td></tr>
{}
</tbody></table>
</body></html>"#,
            rows.join("\n")
        )
    }

    fn up_row(rank: u32) -> String {
        row_html(
            &rank.to_string(),
            &format!("{rank:06}"),
            &format!("Company {rank}"),
            "https://ssl.pstatic.net/imgstock/images/images4/ico_up.gif",
            "1,200",
            "+1.71%",
        )
    }

    #[test]
    fn derive_sign_matches_down_and_fall() {
        assert_eq!(derive_sign("/images/ico_down.gif"), Direction::Negative);
        assert_eq!(derive_sign("/images/arrow_fall.png"), Direction::Negative);
        assert_eq!(derive_sign("/images/ico_up.gif"), Direction::Positive);
        assert_eq!(derive_sign(""), Direction::Positive);
        assert_eq!(derive_sign("/images/ico_DOWN.gif"), Direction::Positive);
    }

    #[test]
    fn numeric_fields_parse_like_leading_numerals() {
        assert_eq!(parse_int(" 1,234,500 "), Some(1_234_500));
        assert_eq!(parse_int("-300"), Some(-300));
        assert_eq!(parse_int("12abc"), Some(12));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_decimal("-1.23%"), Some(-1.23));
        assert_eq!(parse_decimal("+0.50"), Some(0.5));
        assert_eq!(parse_decimal("N/A"), None);
    }

    #[test]
    fn rank_filter_keeps_only_one_through_ten() {
        let html = page(&[
            row_html("0", "000001", "Zero", "", "1", "1.0"),
            row_html("11", "000011", "Eleven", "", "1", "1.0"),
            row_html("abc", "000099", "Letters", "", "1", "1.0"),
            row_html("5", "000005", "Five", "", "1", "1.0"),
        ]);

        let snapshot = parse_ranking_table(&html);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.rows()[0].rank, 5);
        assert_eq!(snapshot.rows()[0].company_name, "Five");
    }

    #[test]
    fn short_rows_are_ignored() {
        let html = page(&[String::from(
            r#"<tr><td>1</td><td><a href="?code=005930">Samsung</a></td><td>71,500</td>
               <td>1</td><td>1</td><td>1.0</td></tr>"#,
        )]);

        assert!(parse_ranking_table(&html).is_empty());
    }

    #[test]
    fn down_icon_forces_negative_values() {
        let html = page(&[
            row_html("1", "005930", "삼성전자", "/img/ico_down.gif", "500", "0.69%"),
            row_html("2", "000660", "SK하이닉스", "/img/ico_up.gif", "-2,500", "-1.41%"),
        ]);

        let snapshot = parse_ranking_table(&html);
        let rows = snapshot.rows();

        assert_eq!(rows[0].change, -500);
        assert_eq!(rows[0].change_pct, -0.69);
        assert_eq!(rows[1].change, 2_500);
        assert_eq!(rows[1].change_pct, 1.41);
    }

    #[test]
    fn row_fields_are_extracted() {
        let html = page(&[row_html(
            "1",
            "005930",
            "  삼성전자  ",
            "/img/ico_up.gif",
            "1,200",
            "+1.71%",
        )]);

        let snapshot = parse_ranking_table(&html);
        let row = &snapshot.rows()[0];

        assert_eq!(row.rank, 1);
        assert_eq!(row.stock_code, "005930");
        assert_eq!(row.company_name, "삼성전자");
        assert_eq!(row.price, 71_500);
        assert_eq!(row.change, 1_200);
        assert_eq!(row.change_pct, 1.71);
    }

    #[test]
    fn missing_code_and_garbage_numbers_default() {
        let html = page(&[String::from(
            r#"<tr><td>3</td><td><a href="/item/main.naver">NoCode</a></td><td>-</td>
               <td></td><td>n/a</td><td>?</td><td></td></tr>"#,
        )]);

        let snapshot = parse_ranking_table(&html);
        let row = &snapshot.rows()[0];

        assert_eq!(row.stock_code, "");
        assert_eq!(row.price, 0);
        assert_eq!(row.change, 0);
        assert_eq!(row.change_pct, 0.0);
    }

    #[test]
    fn result_is_truncated_to_ten_in_document_order() {
        let rows: Vec<String> = (1..=10).map(up_row).chain((1..=5).map(up_row)).collect();
        let snapshot = parse_ranking_table(&page(&rows));

        assert_eq!(snapshot.len(), 10);
        let ranks: Vec<u32> = snapshot.rows().iter().map(|row| row.rank).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<_>>());

        let shuffled: Vec<String> = [3, 1, 2, 9, 4, 4, 7, 8, 5, 6, 10, 2, 3, 1, 5]
            .into_iter()
            .map(up_row)
            .collect();
        let snapshot = parse_ranking_table(&page(&shuffled));
        let ranks: Vec<u32> = snapshot.rows().iter().map(|row| row.rank).collect();
        assert_eq!(ranks, [3, 1, 2, 9, 4, 4, 7, 8, 5, 6]);
    }

    #[test]
    fn duplicate_ranks_are_kept_in_document_order() {
        let html = page(&[
            row_html("1", "005930", "First", "", "1", "1.0"),
            row_html("1", "000660", "Second", "", "1", "1.0"),
        ]);

        let snapshot = parse_ranking_table(&html);
        let names: Vec<&str> = snapshot
            .rows()
            .iter()
            .map(|row| row.company_name.as_str())
            .collect();

        assert_eq!(names, ["First", "Second"]);
    }

    #[test]
    fn rows_outside_the_ranking_table_are_ignored() {
        let html = format!(
            "<table class=\"other\"><tbody>{}</tbody></table>",
            up_row(1)
        );
        assert!(parse_ranking_table(&html).is_empty());
    }

    #[test]
    fn empty_document_is_an_empty_snapshot() {
        assert!(parse_ranking_table("").is_empty());
    }

    #[test]
    fn cells_nested_inside_a_cell_do_not_shift_columns() {
        let html = page(&[String::from(
            r#"<tr><td>1</td>
<td><a href="/item/main.naver?code=005930">삼성전자</a><table><tr><td>우</td></tr></table></td>
<td>71,500</td><td>100</td>
<td><img src="/ico_down.gif"><span>500</span></td><td>-0.69%</td><td>1</td></tr>"#,
        )]);

        let snapshot = parse_ranking_table(&html);

        assert_eq!(snapshot.len(), 1);
        let row = &snapshot.rows()[0];
        assert_eq!(row.stock_code, "005930");
        assert_eq!(row.price, 71_500);
        assert_eq!(row.change, -500);
        assert_eq!(row.change_pct, -0.69);
    }
}
