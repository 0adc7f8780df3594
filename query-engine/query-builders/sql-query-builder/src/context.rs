/// The SQL dialect statements are rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlFamily {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderFormat {
    /// `?`
    QuestionMark,
    /// `$1`, `$2`, ...
    Numbered,
}

#[derive(Debug, Clone)]
pub struct Context {
    sql_family: SqlFamily,
    placeholder_format: PlaceholderFormat,
}

impl Context {
    pub fn new(sql_family: SqlFamily) -> Self {
        let placeholder_format = match sql_family {
            SqlFamily::Postgres => PlaceholderFormat::Numbered,
            SqlFamily::Mysql | SqlFamily::Sqlite => PlaceholderFormat::QuestionMark,
        };

        Self {
            sql_family,
            placeholder_format,
        }
    }

    pub fn with_placeholder_format(mut self, placeholder_format: PlaceholderFormat) -> Self {
        self.placeholder_format = placeholder_format;
        self
    }

    pub fn sql_family(&self) -> SqlFamily {
        self.sql_family
    }

    pub fn placeholder_format(&self) -> PlaceholderFormat {
        self.placeholder_format
    }

    /// Quotes an identifier, doubling any embedded quote character.
    pub fn quote(&self, identifier: &str) -> String {
        let quote = match self.sql_family {
            SqlFamily::Mysql => '`',
            SqlFamily::Postgres | SqlFamily::Sqlite => '"',
        };

        let escaped = identifier.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Placeholder for the parameter at 1-based `position`.
    pub fn placeholder(&self, position: usize) -> String {
        match self.placeholder_format {
            PlaceholderFormat::QuestionMark => "?".to_owned(),
            PlaceholderFormat::Numbered => format!("${position}"),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(SqlFamily::default())
    }
}
