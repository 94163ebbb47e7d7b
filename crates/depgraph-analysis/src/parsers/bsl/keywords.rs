//! Keyword tables. Every language keyword has an English and a Russian
//! spelling; lookups take an already-lowercased identifier.

use depgraph_core::types::MetadataKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Procedure,
    Function,
    EndProcedure,
    EndFunction,
    Export,
    Val,
    Var,
    If,
    Then,
    ElsIf,
    Else,
    EndIf,
    While,
    For,
    Each,
    In,
    To,
    Do,
    EndDo,
    Try,
    Except,
    EndTry,
    New,
    Return,
    And,
    Or,
    Not,
    Raise,
    Break,
    Continue,
    Literal,
}

pub fn keyword(lower: &str) -> Option<Keyword> {
    use Keyword::*;
    let kw = match lower {
        "procedure" | "процедура" => Procedure,
        "function" | "функция" => Function,
        "endprocedure" | "конецпроцедуры" => EndProcedure,
        "endfunction" | "конецфункции" => EndFunction,
        "export" | "экспорт" => Export,
        "val" | "знач" => Val,
        "var" | "перем" => Var,
        "if" | "если" => If,
        "then" | "тогда" => Then,
        "elsif" | "иначеесли" => ElsIf,
        "else" | "иначе" => Else,
        "endif" | "конецесли" => EndIf,
        "while" | "пока" => While,
        "for" | "для" => For,
        "each" | "каждого" => Each,
        "in" | "из" => In,
        "to" | "по" => To,
        "do" | "цикл" => Do,
        "enddo" | "конеццикла" => EndDo,
        "try" | "попытка" => Try,
        "except" | "исключение" => Except,
        "endtry" | "конецпопытки" => EndTry,
        "new" | "новый" => New,
        "return" | "возврат" => Return,
        "and" | "и" => And,
        "or" | "или" => Or,
        "not" | "не" => Not,
        "raise" | "вызватьисключение" => Raise,
        "break" | "прервать" => Break,
        "continue" | "продолжить" => Continue,
        "true" | "истина" | "false" | "ложь" | "undefined" | "неопределено" | "null" => Literal,
        _ => return None,
    };
    Some(kw)
}

/// Keywords after which a new statement begins.
pub fn opens_statement(kw: Keyword) -> bool {
    matches!(
        kw,
        Keyword::Then | Keyword::Do | Keyword::Else | Keyword::Try | Keyword::Except | Keyword::Export
    )
}

/// Global manager objects (`Catalogs`, `Справочники`, ...) mapped to the
/// kind of object they manage. Common modules have no manager.
pub fn manager_kind(lower: &str) -> Option<MetadataKind> {
    let kind = match lower {
        "справочники" => MetadataKind::Catalog,
        "документы" => MetadataKind::Document,
        "регистрысведений" => MetadataKind::InformationRegister,
        "регистрынакопления" => MetadataKind::AccumulationRegister,
        "регистрыбухгалтерии" => MetadataKind::AccountingRegister,
        "регистрырасчета" => MetadataKind::CalculationRegister,
        "перечисления" => MetadataKind::Enum,
        "константы" => MetadataKind::Constant,
        "отчеты" => MetadataKind::Report,
        "обработки" => MetadataKind::DataProcessor,
        "планывидовхарактеристик" => MetadataKind::ChartOfCharacteristicTypes,
        "планысчетов" => MetadataKind::ChartOfAccounts,
        "бизнеспроцессы" => MetadataKind::BusinessProcess,
        "задачи" => MetadataKind::Task,
        "планыобмена" => MetadataKind::ExchangePlan,
        "журналыдокументов" => MetadataKind::DocumentJournal,
        other => {
            return MetadataKind::from_folder(other).filter(|k| *k != MetadataKind::CommonModule)
        }
    };
    Some(kind)
}

/// Singular type names used in query text (`Справочник.Товары`).
pub fn singular_kind(lower: &str) -> Option<MetadataKind> {
    let kind = match lower {
        "справочник" => MetadataKind::Catalog,
        "документ" => MetadataKind::Document,
        "регистрсведений" => MetadataKind::InformationRegister,
        "регистрнакопления" => MetadataKind::AccumulationRegister,
        "регистрбухгалтерии" => MetadataKind::AccountingRegister,
        "регистррасчета" => MetadataKind::CalculationRegister,
        "перечисление" => MetadataKind::Enum,
        "константа" => MetadataKind::Constant,
        "планвидовхарактеристик" => MetadataKind::ChartOfCharacteristicTypes,
        "плансчетов" => MetadataKind::ChartOfAccounts,
        "бизнеспроцесс" => MetadataKind::BusinessProcess,
        "задача" => MetadataKind::Task,
        "планобмена" => MetadataKind::ExchangePlan,
        "журналдокументов" => MetadataKind::DocumentJournal,
        other => return MetadataKind::from_name(other).filter(|k| *k != MetadataKind::CommonModule),
    };
    Some(kind)
}

/// `Metadata` / `Метаданные` global property.
pub fn is_metadata_root(lower: &str) -> bool {
    matches!(lower, "metadata" | "метаданные")
}

/// `ThisObject` / `ЭтотОбъект`: a qualified call through it stays in-module.
pub fn is_self_reference(lower: &str) -> bool {
    matches!(lower, "thisobject" | "этотобъект" | "thisform" | "этаформа")
}

/// Platform functions that never resolve to configuration code.
pub fn is_builtin(lower: &str) -> bool {
    matches!(
        lower,
        "message" | "сообщить"
            | "format" | "формат"
            | "strlen" | "стрдлина"
            | "type" | "тип"
            | "typeof" | "типзнч"
            | "valueisfilled" | "значениезаполнено"
            | "nstr" | "нстр"
            | "string" | "строка"
            | "number" | "число"
            | "date" | "дата"
            | "boolean" | "булево"
            | "min" | "мин"
            | "max" | "макс"
            | "currentdate" | "текущаядата"
            | "currentsessiondate" | "текущаядатасеанса"
            | "round" | "окр"
            | "int" | "цел"
            | "left" | "лев"
            | "right" | "прав"
            | "mid" | "сред"
            | "trimall" | "сокрлп"
            | "triml" | "сокрл"
            | "trimr" | "сокрп"
            | "upper" | "врег"
            | "lower" | "нрег"
            | "find" | "найти"
            | "strfind" | "стрнайти"
            | "strreplace" | "стрзаменить"
            | "strtemplate" | "стршаблон"
            | "strsplit" | "стрразделить"
            | "strconcat" | "стрсоединить"
            | "begofday" | "началодня"
            | "endofday" | "конецдня"
            | "year" | "год"
            | "month" | "месяц"
            | "day" | "день"
            | "fillpropertyvalues" | "заполнитьзначениясвойств"
            | "predefinedvalue" | "предопределенноезначение"
            | "eval" | "вычислить"
            | "xmlstring" | "xmlстрока"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_spellings_map_to_one_keyword() {
        assert_eq!(keyword("процедура"), Some(Keyword::Procedure));
        assert_eq!(keyword("procedure"), Some(Keyword::Procedure));
        assert_eq!(keyword("конецфункции"), Some(Keyword::EndFunction));
        assert_eq!(keyword("calculate"), None);
    }

    #[test]
    fn managers() {
        assert_eq!(manager_kind("справочники"), Some(MetadataKind::Catalog));
        assert_eq!(manager_kind("informationregisters"), Some(MetadataKind::InformationRegister));
        assert_eq!(manager_kind("commonmodules"), None);
        assert_eq!(singular_kind("документ"), Some(MetadataKind::Document));
        assert_eq!(singular_kind("catalog"), Some(MetadataKind::Catalog));
    }
}
