//! 筛选引擎
//!
//! 阈值筛选潜在涨停候选，以及代码/名称/行业多关键词模糊搜索

use std::cmp::Ordering;

use crate::models::{FilterCriteria, StockSnapshotRow};

/// 是否满足候选的四项阈值条件
pub fn matches_criteria(row: &StockSnapshotRow, criteria: &FilterCriteria) -> bool {
    row.pct_change >= criteria.min_rise
        && row.pct_change <= criteria.max_rise
        && row.main_net_inflow >= criteria.min_main_inflow
        && row.turnover_rate >= criteria.min_turnover
        && row.float_market_cap <= criteria.max_market_cap
}

/// 从实时行情中筛选潜在涨停候选
///
/// 结果按主力净流入降序；净流入相同的行保持输入顺序
pub fn screen_candidates(
    spot: &[StockSnapshotRow],
    criteria: &FilterCriteria,
) -> Vec<StockSnapshotRow> {
    let mut candidates: Vec<StockSnapshotRow> = spot
        .iter()
        .filter(|row| matches_criteria(row, criteria))
        .cloned()
        .collect();

    candidates.sort_by(|a, b| {
        b.main_net_inflow
            .partial_cmp(&a.main_net_inflow)
            .unwrap_or(Ordering::Equal)
    });
    candidates
}

/// 将搜索文本拆分为小写关键词
pub fn parse_keywords(text: &str) -> Vec<String> {
    text.split_whitespace().map(|kw| kw.to_lowercase()).collect()
}

fn row_matches_keyword(row: &StockSnapshotRow, keyword: &str) -> bool {
    [&row.code, &row.name, &row.industry]
        .iter()
        .any(|field| field.to_lowercase().contains(keyword))
}

/// 多关键词模糊搜索
///
/// 每个关键词都须命中代码、名称、行业中的至少一项；无关键词时原样返回
pub fn apply_search(rows: &[StockSnapshotRow], keywords: &[String]) -> Vec<StockSnapshotRow> {
    if keywords.is_empty() {
        return rows.to_vec();
    }

    let keywords: Vec<String> = keywords.iter().map(|kw| kw.to_lowercase()).collect();
    rows.iter()
        .filter(|row| keywords.iter().all(|kw| row_matches_keyword(row, kw)))
        .cloned()
        .collect()
}

/// 涨停板按首次封板时间升序，无封板时间的排在最后
pub fn sort_limit_up(rows: &mut [StockSnapshotRow]) {
    rows.sort_by(|a, b| match (a.limit_time.is_empty(), b.limit_time.is_empty()) {
        (false, false) => a.limit_time.cmp(&b.limit_time),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, pct: f64, inflow: f64, turnover: f64, cap: f64) -> StockSnapshotRow {
        StockSnapshotRow {
            code: code.to_string(),
            name: format!("股票{}", code),
            pct_change: pct,
            main_net_inflow: inflow,
            turnover_rate: turnover,
            float_market_cap: cap,
            ..Default::default()
        }
    }

    fn codes(rows: &[StockSnapshotRow]) -> Vec<&str> {
        rows.iter().map(|r| r.code.as_str()).collect()
    }

    fn scenario_criteria() -> FilterCriteria {
        FilterCriteria {
            min_rise: 4.0,
            max_rise: 9.5,
            min_main_inflow: 30_000_000.0,
            min_turnover: 5.0,
            max_market_cap: 15_000_000_000.0,
            search_keywords: Vec::new(),
        }
    }

    #[test]
    fn test_market_cap_ceiling() {
        let criteria = scenario_criteria();
        let included = row("600001", 5.0, 35_000_000.0, 6.0, 10_000_000_000.0);
        let excluded = row("600001", 5.0, 35_000_000.0, 6.0, 20_000_000_000.0);

        assert_eq!(screen_candidates(&[included.clone()], &criteria), vec![included]);
        assert!(screen_candidates(&[excluded], &criteria).is_empty());
    }

    #[test]
    fn test_every_result_satisfies_all_predicates() {
        let criteria = scenario_criteria();
        let spot = vec![
            row("1", 3.9, 40_000_000.0, 6.0, 1e9),
            row("2", 4.0, 40_000_000.0, 6.0, 1e9),
            row("3", 9.5, 30_000_000.0, 5.0, 15e9),
            row("4", 9.6, 40_000_000.0, 6.0, 1e9),
            row("5", 6.0, 29_999_999.0, 6.0, 1e9),
            row("6", 6.0, 40_000_000.0, 4.9, 1e9),
            row("7", f64::NAN, 40_000_000.0, 6.0, 1e9),
        ];

        let result = screen_candidates(&spot, &criteria);
        let codes: Vec<&str> = result.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["2", "3"]);
        for r in &result {
            assert!(matches_criteria(r, &criteria));
            assert!(spot.iter().any(|s| s.code == r.code));
        }
    }

    #[test]
    fn test_sorted_by_inflow_stable() {
        let criteria = scenario_criteria();
        let spot = vec![
            row("a", 5.0, 40_000_000.0, 6.0, 1e9),
            row("b", 5.0, 90_000_000.0, 6.0, 1e9),
            row("c", 5.0, 40_000_000.0, 6.0, 1e9),
            row("d", 5.0, 50_000_000.0, 6.0, 1e9),
        ];

        let result = screen_candidates(&spot, &criteria);
        let codes: Vec<&str> = result.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["b", "d", "a", "c"]);
        // 输入不被修改
        assert_eq!(spot[0].code, "a");
    }

    #[test]
    fn test_empty_spot() {
        assert!(screen_candidates(&[], &scenario_criteria()).is_empty());
        assert!(apply_search(&[], &parse_keywords("bank")).is_empty());
    }

    #[test]
    fn test_search_identity_when_empty() {
        let rows = vec![row("1", 1.0, 0.0, 0.0, 0.0), row("2", 2.0, 0.0, 0.0, 0.0)];
        assert_eq!(apply_search(&rows, &[]), rows);
        assert_eq!(apply_search(&rows, &parse_keywords("   ")), rows);
    }

    #[test]
    fn test_search_across_fields() {
        let mut target = row("600001", 1.0, 0.0, 0.0, 0.0);
        target.name = "Alpha".to_string();
        target.industry = "bank".to_string();
        let mut other = row("000002", 1.0, 0.0, 0.0, 0.0);
        other.industry = "bank".to_string();

        let result = apply_search(&[target.clone(), other], &parse_keywords("600 bank"));
        assert_eq!(result, vec![target]);
    }

    #[test]
    fn test_search_case_insensitive() {
        let mut r = row("600001", 1.0, 0.0, 0.0, 0.0);
        r.name = "ABC Tech".to_string();
        assert_eq!(apply_search(&[r.clone()], &parse_keywords("abc")).len(), 1);
        assert_eq!(apply_search(&[r], &["TECH".to_string()]).len(), 1);
    }

    #[test]
    fn test_search_composable() {
        let rows: Vec<StockSnapshotRow> = [
            ("600001", "银行甲", "银行"),
            ("600002", "科技乙", "软件"),
            ("600601", "银行丙", "银行"),
            ("000602", "银行戊", "银行"),
            ("300600", "化工丁", "化工"),
        ]
        .iter()
        .map(|(code, name, industry)| StockSnapshotRow {
            code: code.to_string(),
            name: name.to_string(),
            industry: industry.to_string(),
            ..Default::default()
        })
        .collect();

        let both = apply_search(&rows, &parse_keywords("600 银行"));
        let chained = apply_search(&apply_search(&rows, &parse_keywords("600")), &parse_keywords("银行"));
        assert_eq!(both, chained);
        assert_eq!(codes(&both), vec!["600001", "600601"]);
    }

    #[test]
    fn test_sort_limit_up_by_time() {
        let mut rows: Vec<StockSnapshotRow> = [("a", "13:01:00"), ("b", ""), ("c", "09:25:00")]
            .iter()
            .map(|(code, time)| StockSnapshotRow {
                code: code.to_string(),
                limit_time: time.to_string(),
                ..Default::default()
            })
            .collect();

        sort_limit_up(&mut rows);
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["c", "a", "b"]);
    }
}
