use std::cmp::Ordering;
use log::info;

use crate::companies::loader::Company;

/// The company list sorted ascending by market cap. Built once at startup and
/// shared read-only behind an `Arc` - queries never mutate it.
pub struct CompanyLadder {
    companies: Vec<Company>,
}

impl CompanyLadder {
    pub fn new(mut companies: Vec<Company>) -> Self {
        // Stable sort: rows with equal market caps keep their file order.
        companies.sort_by(|a, b| {
            a.marketcap
                .partial_cmp(&b.marketcap)
                .unwrap_or(Ordering::Equal)
        });
        info!("Ranked {} companies by market cap", companies.len());
        Self { companies }
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Index of the first company whose market cap is >= the query, or
    /// `len()` when every company is below it. Exact matches are returned
    /// directly, not skipped.
    pub fn rank_position(&self, market_cap: f64) -> usize {
        self.companies
            .partition_point(|company| company.marketcap < market_cap)
    }

    /// The company the query value currently sits under and the next one up
    /// the ladder. A query below every entry reports the smallest company as
    /// current; a query above every entry reports the largest with no next.
    pub fn resolve_neighbors(&self, market_cap: f64) -> (Option<Company>, Option<Company>) {
        if self.companies.is_empty() {
            return (None, None);
        }

        let position = self.rank_position(market_cap);

        if position == 0 {
            (
                Some(self.companies[0].clone()),
                self.companies.get(1).cloned(),
            )
        } else if position == self.companies.len() {
            (
                Some(self.companies[self.companies.len() - 1].clone()),
                None,
            )
        } else {
            (
                Some(self.companies[position].clone()),
                self.companies.get(position + 1).cloned(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(name: &str, marketcap: f64) -> Company {
        Company {
            name: name.to_string(),
            symbol: name.to_string(),
            marketcap,
        }
    }

    fn three_rung_ladder() -> CompanyLadder {
        CompanyLadder::new(vec![
            company("B", 200.0),
            company("A", 100.0),
            company("C", 300.0),
        ])
    }

    #[test]
    fn test_new_sorts_ascending() {
        let ladder = three_rung_ladder();

        assert_eq!(ladder.len(), 3);
        assert_eq!(ladder.rank_position(100.0), 0);
        assert_eq!(ladder.rank_position(200.0), 1);
        assert_eq!(ladder.rank_position(300.0), 2);
    }

    #[test]
    fn test_rank_position_first_at_or_above() {
        let ladder = three_rung_ladder();

        assert_eq!(ladder.rank_position(50.0), 0);
        assert_eq!(ladder.rank_position(150.0), 1);
        assert_eq!(ladder.rank_position(250.0), 2);
        assert_eq!(ladder.rank_position(1000.0), 3);
    }

    #[test]
    fn test_rank_position_is_idempotent() {
        let ladder = three_rung_ladder();

        assert_eq!(ladder.rank_position(150.0), ladder.rank_position(150.0));
        assert_eq!(ladder.rank_position(300.0), ladder.rank_position(300.0));
    }

    #[test]
    fn test_neighbors_between_entries() {
        let ladder = three_rung_ladder();

        let (current, next) = ladder.resolve_neighbors(150.0);
        assert_eq!(current.unwrap().name, "B");
        assert_eq!(next.unwrap().name, "C");
    }

    #[test]
    fn test_neighbors_exact_match() {
        let ladder = three_rung_ladder();

        let (current, next) = ladder.resolve_neighbors(200.0);
        assert_eq!(current.unwrap().name, "B");
        assert_eq!(next.unwrap().name, "C");
    }

    #[test]
    fn test_neighbors_below_every_entry() {
        let ladder = three_rung_ladder();

        let (current, next) = ladder.resolve_neighbors(50.0);
        assert_eq!(current.unwrap().name, "A");
        assert_eq!(next.unwrap().name, "B");
    }

    #[test]
    fn test_neighbors_above_every_entry() {
        let ladder = three_rung_ladder();

        let (current, next) = ladder.resolve_neighbors(1000.0);
        assert_eq!(current.unwrap().name, "C");
        assert!(next.is_none());
    }

    #[test]
    fn test_neighbors_bracket_the_query() {
        let ladder = three_rung_ladder();

        for query in [50.0, 150.0, 200.0, 250.0, 299.9] {
            let (current, next) = ladder.resolve_neighbors(query);
            if let (Some(current), Some(next)) = (current, next) {
                assert!(current.marketcap <= next.marketcap);
                assert!(query <= next.marketcap);
            }
        }
    }

    #[test]
    fn test_neighbors_empty_ladder() {
        let ladder = CompanyLadder::new(Vec::new());

        assert!(ladder.is_empty());
        assert_eq!(ladder.resolve_neighbors(100.0), (None, None));
    }

    #[test]
    fn test_neighbors_single_entry() {
        let ladder = CompanyLadder::new(vec![company("A", 100.0)]);

        let (current, next) = ladder.resolve_neighbors(50.0);
        assert_eq!(current.unwrap().name, "A");
        assert!(next.is_none());

        let (current, next) = ladder.resolve_neighbors(500.0);
        assert_eq!(current.unwrap().name, "A");
        assert!(next.is_none());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let ladder = CompanyLadder::new(vec![
            company("First", 100.0),
            company("Second", 100.0),
            company("Third", 100.0),
        ]);

        let (current, next) = ladder.resolve_neighbors(100.0);
        assert_eq!(current.unwrap().name, "First");
        assert_eq!(next.unwrap().name, "Second");
    }
}
