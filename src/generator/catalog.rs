//! Fixed tables behind synthetic predictions and render-time fallbacks.
//!
//! Built once at startup and shared read-only (`Arc<Catalog>`).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::Sport;

/// Per-sport tables.
#[derive(Debug, Clone)]
pub struct SportTable {
    pub sport: Sport,
    pub leagues: Vec<&'static str>,
    pub bet_types: Vec<&'static str>,
    /// Teams, or players for individual sports. At least two entries.
    pub roster: Vec<&'static str>,
    /// Sentence bodies appended to an opener from `analysis_openers`.
    pub analysis_bodies: Vec<&'static str>,
}

/// Every static table the bot draws from.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub sports: Vec<SportTable>,
    pub odds: Vec<Decimal>,
    pub analysis_openers: Vec<&'static str>,
    pub closing_sentences: Vec<&'static str>,
    pub factor_pool: Vec<&'static str>,
    /// Shown when a prediction carries no match time.
    pub display_times: Vec<&'static str>,
}

impl Catalog {
    pub fn table(&self, sport: Sport) -> &SportTable {
        self.sports
            .iter()
            .find(|t| t.sport == sport)
            .unwrap_or(&self.sports[0])
    }

    /// First league of `sport` named in `text`, case-insensitively.
    pub fn find_league(&self, sport: Sport, text: &str) -> Option<&'static str> {
        let lower = text.to_lowercase();
        self.table(sport)
            .leagues
            .iter()
            .copied()
            .find(|league| lower.contains(&league.to_lowercase()))
    }

    /// First bet type of `sport` containing `keyword`, case-insensitively.
    pub fn find_bet_type(&self, sport: Sport, keyword: &str) -> Option<&'static str> {
        let needle = keyword.to_lowercase();
        self.table(sport)
            .bet_types
            .iter()
            .copied()
            .find(|bet| bet.to_lowercase().contains(&needle))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            sports: vec![
                SportTable {
                    sport: Sport::Football,
                    leagues: vec!["Премьер-лига", "Ла Лига", "Серия А", "Бундеслига", "Лига 1"],
                    bet_types: vec![
                        "Победа хозяев",
                        "Ничья",
                        "Победа гостей",
                        "Тотал больше 2.5",
                        "Тотал меньше 2.5",
                        "Обе забьют",
                    ],
                    roster: vec![
                        "Манчестер Сити",
                        "Ливерпуль",
                        "Челси",
                        "Арсенал",
                        "Барселона",
                        "Реал Мадрид",
                        "ПСЖ",
                        "Бавария",
                        "Ювентус",
                        "Милан",
                        "Интер",
                        "Наполи",
                    ],
                    analysis_bodies: vec![
                        "высокую вероятность данного исхода. Команды демонстрируют стабильную игру в атаке и защите.",
                        "преимущество в классе исполнителей и тактической подготовке.",
                        "статистическое превосходство в ключевых показателях эффективности.",
                    ],
                },
                SportTable {
                    sport: Sport::Basketball,
                    leagues: vec!["НБА", "Евролига", "ВТБ", "NCAA"],
                    bet_types: vec![
                        "Победа хозяев",
                        "Победа гостей",
                        "Тотал больше",
                        "Тотал меньше",
                        "Фора",
                    ],
                    roster: vec![
                        "Лейкерс",
                        "Уорриорз",
                        "Селтикс",
                        "Нетс",
                        "ЦСКА",
                        "Зенит",
                        "Химки",
                        "Локомотив",
                    ],
                    analysis_bodies: vec![
                        "высокий процент реализации бросков и контроль подбора.",
                        "преимущество в скорости атак и глубине состава.",
                        "тактическое превосходство в защитных схемах.",
                    ],
                },
                SportTable {
                    sport: Sport::Tennis,
                    leagues: vec!["ATP", "WTA", "Челленджер", "ITF"],
                    bet_types: vec![
                        "Победа игрока 1",
                        "Победа игрока 2",
                        "Тотал геймов больше",
                        "Тотал геймов меньше",
                    ],
                    roster: vec![
                        "Новак Джокович",
                        "Рафаэль Надаль",
                        "Даниил Медведев",
                        "Карлос Алькарас",
                        "Арина Соболенко",
                        "Ига Свёнтек",
                    ],
                    analysis_bodies: vec![
                        "преимущество в технике подачи и приема.",
                        "психологическое превосходство и опыт турниров.",
                        "физическую готовность и выносливость игрока.",
                    ],
                },
                SportTable {
                    sport: Sport::Hockey,
                    leagues: vec!["НХЛ", "КХЛ", "SHL", "DEL"],
                    bet_types: vec![
                        "Победа в основное время",
                        "Тотал больше 5.5",
                        "Тотал меньше 5.5",
                        "Обе забьют",
                    ],
                    roster: vec!["Рейнджерс", "Брюинз", "СКА", "ЦСКА", "Динамо М", "Ак Барс"],
                    analysis_bodies: vec![
                        "эффективность игры в большинстве и меньшинстве.",
                        "класс вратаря и надежность обороны.",
                        "скорость атак и реализацию моментов.",
                    ],
                },
            ],
            odds: vec![
                dec!(1.45),
                dec!(1.65),
                dec!(1.85),
                dec!(2.10),
                dec!(2.35),
                dec!(2.60),
                dec!(2.85),
                dec!(3.20),
            ],
            analysis_openers: vec![
                "Статистический анализ показывает",
                "Анализ последних 5 матчей показывает",
                "Тактический анализ указывает на",
                "Форма соперников подчеркивает",
                "Мотивационный расклад подтверждает",
            ],
            closing_sentences: vec![
                "Букмекеры пока недооценивают этот исход.",
                "Линия выглядит привлекательно для ставки.",
                "Личные встречи также говорят в пользу прогноза.",
                "Кадровая ситуация играет на руку фавориту.",
                "Турнирное положение добавляет мотивации.",
            ],
            factor_pool: vec![
                "Домашнее преимущество",
                "Травмы ключевых игроков",
                "Турнирная мотивация",
                "Статистика личных встреч",
                "Текущая форма команды",
                "Тактическая совместимость",
                "Психологический фактор",
                "Погодные условия",
                "Усталость от плотного календаря",
                "Статистика забитых/пропущенных голов",
            ],
            display_times: vec![
                "15:00 МСК",
                "17:30 МСК",
                "19:00 МСК",
                "20:45 МСК",
                "22:00 МСК",
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
