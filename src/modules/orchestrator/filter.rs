use serde::{Deserialize, Serialize};

/// 显示名称的字面量替换规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub source: String,
    pub replacement: String,
}

impl Filter {
    pub fn new(name: &str, source: &str, replacement: &str) -> Self {
        tracing::debug!(
            "创建过滤器 - name: {}, source: {}, target: {}",
            name,
            source,
            replacement
        );
        Self {
            name: name.to_string(),
            source: source.to_string(),
            replacement: replacement.to_string(),
        }
    }
}

/// 有序的替换规则列表, 按注册顺序依次应用
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn apply(&self, source: &str) -> String {
        self.filters
            .iter()
            .filter(|f| !f.source.is_empty())
            .fold(source.to_string(), |text, f| text.replace(&f.source, &f.replacement))
    }
}

/// 内置的名称缩写规则
pub fn default_filters() -> Vec<Filter> {
    vec![
        Filter::new(
            "Replace Visual Studio with shorter version",
            "Microsoft Visual Studio ",
            "VS ",
        ),
        Filter::new("Shorten Microsoft", "Microsoft ", "MS "),
        Filter::new("Shorten Team Foundation Server", "Team Foundation Server ", "TFS "),
        Filter::new("Shorten Visual C++", "Visual C++ ", "VC "),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_filters_in_registration_order() {
        let set = FilterSet::new(default_filters());
        assert_eq!(
            set.apply("Microsoft Visual Studio Ultimate 2013"),
            "VS Ultimate 2013"
        );
        assert_eq!(
            set.apply("Microsoft Visual C++ 2013 Redistributable"),
            "MS VC 2013 Redistributable"
        );
    }

    #[test]
    fn later_filters_see_earlier_output() {
        let set = FilterSet::new(vec![
            Filter::new("a", "alpha", "beta"),
            Filter::new("b", "beta", "gamma"),
        ]);
        assert_eq!(set.apply("alpha"), "gamma");
    }

    #[test]
    fn empty_source_is_ignored() {
        let set = FilterSet::new(vec![Filter::new("noop", "", "x")]);
        assert_eq!(set.apply("name"), "name");
    }
}
