//! Criteria listing, uniqueness, paging and row counts

use serde_json::Value;
use tracing::debug;

use super::{from_record, from_records, to_record, Repository};
use crate::error::{RepoError, RepoResult};
use crate::models::{Entity, Page};
use crate::query::{count_query_for, CountQuery, Criteria, Order, Restriction};
use crate::storage::eval;

impl<T: Entity> Repository<T> {
    fn check_criteria(&self, criteria: &Criteria) -> RepoResult<()> {
        if criteria.entity() != T::ENTITY_NAME {
            return Err(RepoError::Validation(format!(
                "Criteria for {} used with the {} repository",
                criteria.entity(),
                T::ENTITY_NAME
            )));
        }
        Ok(())
    }

    fn check_page_size(page_size: usize) -> RepoResult<()> {
        if page_size == 0 {
            return Err(RepoError::Validation("Page size must be at least 1".into()));
        }
        Ok(())
    }

    /// Criteria over `T` with the given restrictions
    pub fn create_criteria(&self, restrictions: impl IntoIterator<Item = Restriction>) -> Criteria {
        Criteria::new(T::ENTITY_NAME).add_all(restrictions)
    }

    /// Criteria over `T` with the given restrictions and one sort key
    pub fn create_ordered_criteria(
        &self,
        order_by: &str,
        ascending: bool,
        restrictions: impl IntoIterator<Item = Restriction>,
    ) -> Criteria {
        self.create_criteria(restrictions)
            .add_order(Order::new(order_by, ascending))
    }

    /// Every entity matching a criteria
    pub fn find(&self, criteria: &Criteria) -> RepoResult<Vec<T>> {
        self.check_criteria(criteria)?;
        from_records(self.session().list(criteria, None)?)
    }

    pub fn get_all(&self) -> RepoResult<Vec<T>> {
        self.find(&Criteria::new(T::ENTITY_NAME))
    }

    pub fn get_all_ordered(&self, order_by: &str, ascending: bool) -> RepoResult<Vec<T>> {
        self.find(&Criteria::new(T::ENTITY_NAME).add_order(Order::new(order_by, ascending)))
    }

    /// Entities whose field equals the value; `Value::Null` matches null fields
    pub fn find_by(&self, field: &str, value: impl Into<Value>) -> RepoResult<Vec<T>> {
        self.find(&self.create_criteria([Restriction::eq_or_null(field, value)]))
    }

    pub fn find_by_ordered(
        &self,
        field: &str,
        value: impl Into<Value>,
        order_by: &str,
        ascending: bool,
    ) -> RepoResult<Vec<T>> {
        let criteria = self.create_ordered_criteria(
            order_by,
            ascending,
            [Restriction::eq_or_null(field, value)],
        );
        self.find(&criteria)
    }

    /// Run a query string with positional parameters
    pub fn find_by_query(&self, query: &str, params: &[Value]) -> RepoResult<Vec<T>> {
        from_records(self.session().query(query, params, None)?)
    }

    /// Check that no other row shares the entity's values for the named fields
    ///
    /// `field_names` is comma-separated, e.g. `"name,email"`. A persisted
    /// entity is excluded from the check so that updates don't clash with
    /// themselves.
    pub fn is_unique(&self, entity: &T, field_names: &str) -> RepoResult<bool> {
        let record = to_record(entity)?;
        let mut criteria = Criteria::new(T::ENTITY_NAME);

        for name in field_names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let value = eval::field(&record, name).cloned().ok_or_else(|| {
                RepoError::Validation(format!("{} has no field '{}'", T::ENTITY_NAME, name))
            })?;
            criteria = criteria.add(Restriction::eq(name, value));
        }

        if let Some(id) = entity.persistent_id() {
            criteria = criteria.add(Restriction::not(Restriction::eq(T::ID_FIELD, id)));
        }

        Ok(self.count_by(&criteria)? == 0)
    }

    /// Zero or one entity; several matches are `NonUniqueResult`
    pub fn find_unique(&self, criteria: &Criteria) -> RepoResult<Option<T>> {
        self.check_criteria(criteria)?;
        self.session().unique(criteria)?.map(from_record).transpose()
    }

    pub fn find_unique_by(&self, field: &str, value: impl Into<Value>) -> RepoResult<Option<T>> {
        self.find_unique(&self.create_criteria([Restriction::eq(field, value)]))
    }

    /// One page of a query string's results, counting the total first
    pub fn find_page(
        &self,
        query: &str,
        page_no: usize,
        page_size: usize,
        params: &[Value],
    ) -> RepoResult<Page<T>> {
        Self::check_page_size(page_size)?;
        let total = self.count_query(query, params)?;
        self.find_page_with_total(query, page_no, page_size, total, params)
    }

    /// One page of a query string's results with a known total
    ///
    /// A total below one returns an empty page without running the query.
    pub fn find_page_with_total(
        &self,
        query: &str,
        page_no: usize,
        page_size: usize,
        total: usize,
        params: &[Value],
    ) -> RepoResult<Page<T>> {
        Self::check_page_size(page_size)?;
        if total < 1 {
            return Ok(Page::empty(page_no, page_size));
        }

        let mut page = Page::new(total, page_no, page_size);
        page.contents = from_records(self.session().query(query, params, Some(page.paging()))?)?;
        debug!(
            entity = T::ENTITY_NAME,
            page = page.number,
            rows = page.contents.len(),
            total,
            "loaded query page"
        );
        Ok(page)
    }

    /// One page of a criteria's results, counting the total first
    pub fn find_page_by(
        &self,
        criteria: &Criteria,
        page_no: usize,
        page_size: usize,
    ) -> RepoResult<Page<T>> {
        Self::check_page_size(page_size)?;
        let total = self.count_by(criteria)?;
        self.find_page_by_with_total(criteria, page_no, page_size, total)
    }

    pub fn find_page_by_with_total(
        &self,
        criteria: &Criteria,
        page_no: usize,
        page_size: usize,
        total: usize,
    ) -> RepoResult<Page<T>> {
        Self::check_page_size(page_size)?;
        self.check_criteria(criteria)?;
        if total < 1 {
            return Ok(Page::empty(page_no, page_size));
        }

        let mut page = Page::new(total, page_no, page_size);
        page.contents = from_records(self.session().list(criteria, Some(page.paging()))?)?;
        debug!(
            entity = T::ENTITY_NAME,
            page = page.number,
            rows = page.contents.len(),
            total,
            "loaded criteria page"
        );
        Ok(page)
    }

    /// Total number of rows of `T`
    pub fn count(&self) -> RepoResult<usize> {
        self.session().count(&CountQuery::all(T::ENTITY_NAME))
    }

    /// Number of rows matching a criteria; the criteria itself is untouched
    pub fn count_by(&self, criteria: &Criteria) -> RepoResult<usize> {
        self.check_criteria(criteria)?;
        self.session().count(&criteria.to_count_query())
    }

    /// Number of rows a query string would return
    ///
    /// The count query is derived textually; see `count_query_for`.
    pub fn count_query(&self, query: &str, params: &[Value]) -> RepoResult<usize> {
        let count_query = count_query_for(query)?;
        self.session().query_count(&count_query, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_context, User};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn seeded() -> Repository<User> {
        let (_, context) = memory_context();
        let repo = Repository::new(context);
        repo.save(&mut User::with_id("1", "alice", 3).with_email("alice@x.io")).unwrap();
        repo.save(&mut User::with_id("2", "bob", 1)).unwrap();
        repo.save(&mut User::with_id("3", "carol", 2).with_email("carol@x.io")).unwrap();
        repo.save(&mut User::with_id("4", "dave", 2)).unwrap();
        repo
    }

    fn names(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_get_all_ordered() {
        let repo = seeded();
        assert_eq!(repo.get_all().unwrap().len(), 4);
        assert_eq!(
            names(&repo.get_all_ordered("name", false).unwrap()),
            vec!["dave", "carol", "bob", "alice"]
        );
    }

    #[test]
    fn test_find_by_null_versus_equality() {
        let repo = seeded();
        let without_email = repo.find_by_ordered("email", Value::Null, "name", true).unwrap();
        assert_eq!(names(&without_email), vec!["bob", "dave"]);

        let with_email = repo.find_by("email", "alice@x.io").unwrap();
        assert_eq!(names(&with_email), vec!["alice"]);

        // Equality with null never matches; only find_by maps it to IS NULL
        let criteria = repo.create_criteria([Restriction::eq("email", Value::Null)]);
        assert!(repo.find(&criteria).unwrap().is_empty());
    }

    #[test]
    fn test_count_leaves_criteria_reusable() {
        let repo = seeded();
        let criteria = repo.create_ordered_criteria("name", true, [Restriction::ge("level", 2)]);
        let before = criteria.clone();

        assert_eq!(repo.count_by(&criteria).unwrap(), 3);
        assert_eq!(criteria, before);
        assert_eq!(
            names(&repo.find(&criteria).unwrap()),
            vec!["alice", "carol", "dave"]
        );
    }

    #[test]
    fn test_is_unique_excludes_self() {
        let repo = seeded();
        let alice = repo.get("1").unwrap().unwrap();
        assert!(repo.is_unique(&alice, "name").unwrap());

        let impostor = User::new("alice", 9);
        assert!(!repo.is_unique(&impostor, "name").unwrap());
        assert!(repo.is_unique(&impostor, "name, level").unwrap());

        let err = repo.is_unique(&impostor, "nickname").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_find_unique() {
        let repo = seeded();
        assert_eq!(repo.find_unique_by("name", "bob").unwrap().unwrap().id.as_deref(), Some("2"));
        assert!(repo.find_unique_by("name", "zed").unwrap().is_none());

        let err = repo.find_unique_by("level", 2).unwrap_err();
        assert!(matches!(err, RepoError::NonUniqueResult { count: 2 }));
    }

    #[test]
    fn test_find_by_query() {
        let repo = seeded();
        let users = repo
            .find_by_query("from User u where u.level = ? order by u.name desc", &[json!(2)])
            .unwrap();
        assert_eq!(names(&users), vec!["dave", "carol"]);
    }

    #[test]
    fn test_find_page_by_query_string() {
        let repo = seeded();
        let page = repo
            .find_page("select u from User u where u.level >= ? order by u.name", 2, 2, &[json!(1)])
            .unwrap();
        assert_eq!(page.total_count, 4);
        assert_eq!(page.number, 2);
        assert_eq!(names(&page.contents), vec!["carol", "dave"]);
        assert!(!page.has_next());
    }

    #[test]
    fn test_page_past_the_end_is_empty_with_total() {
        let repo = seeded();
        let criteria = repo.create_criteria([]);
        let page = repo.find_page_by(&criteria, 9, 3).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_count, 4);
        assert_eq!(page.number, 9);
    }

    #[test]
    fn test_zero_total_short_circuits() {
        let repo = seeded();
        // A malformed query is never run when the total is already known to be zero
        let page = repo.find_page_with_total("not a query", 3, 10, 0, &[]).unwrap();
        assert!(page.is_empty());
        assert_eq!((page.number, page.size, page.total_count), (3, 10, 0));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let repo = seeded();
        let criteria = repo.create_criteria([]);
        assert!(repo.find_page_by(&criteria, 1, 0).unwrap_err().is_validation());
    }

    #[test]
    fn test_counts() {
        let repo = seeded();
        assert_eq!(repo.count().unwrap(), 4);
        assert_eq!(
            repo.count_query("from User where email is not null order by name", &[]).unwrap(),
            2
        );
    }

    #[test]
    fn test_foreign_criteria_is_rejected() {
        let repo = seeded();
        let criteria = Criteria::new("Role");
        assert!(repo.find(&criteria).unwrap_err().is_validation());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_page_size_formula(total in 0usize..40, page_no in 1usize..12, page_size in 1usize..15) {
            let (_, context) = memory_context();
            let repo: Repository<User> = Repository::new(context);
            for i in 0..total {
                repo.save(&mut User::with_id(&format!("{:03}", i), "u", i as i64)).unwrap();
            }

            let criteria = repo.create_ordered_criteria("level", true, []);
            let page = repo.find_page_by(&criteria, page_no, page_size).unwrap();

            let skipped = (page_no - 1) * page_size;
            let expected = page_size.min(total.saturating_sub(skipped));
            prop_assert_eq!(page.contents.len(), expected);
            prop_assert_eq!(page.total_count, total);
            if let Some(first) = page.contents.first() {
                prop_assert_eq!(first.level, skipped as i64);
            }
        }
    }
}
