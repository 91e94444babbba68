//! Built-in legal-form pattern table.
//!
//! Organizational legal-form tokens stripped from normalized organization
//! names before comparison. The table is ordered long forms first so that
//! the alternation prefers the most specific match; short forms carry
//! explicit word boundaries because they are also common name substrings.
//!
//! The table is plain data: pass a custom slice to
//! [`LegalFormStripper::new`](crate::normalize::LegalFormStripper::new) to
//! grow locale coverage without touching the matcher logic.

/// Default legal-form patterns, matched case-insensitively on normalized
/// (ASCII, lowercase, space-collapsed) names.
pub const DEFAULT_PATTERNS: &[&str] = &[
    // ===== Long forms =====

    // Mexico
    r"sociedad anonima promotora de inversion de capital variable",
    r"sociedad de responsabilidad limitada de capital variable",
    r"sociedad anonima de capital variable",
    // EU in general (Spanish, French, Romanian, Portuguese, Italian etc)
    r"sociedad limitada por acciones abierta",
    r"societe par actions ouverte",
    r"societatea publica pe actiuni",
    r"sociedade por acoes aberta",
    r"societa per azioni aperta",
    r"sociedad de responsabilidad limitada",
    r"societa a responsabilita limitata",
    r"sociedad anonima",
    r"societa per azioni",
    r"societatea pe actiuni",
    r"societe par actions",
    r"sociedad limitada",
    r"sociedade por acoes",
    r"societe a responsabilite limitee",
    r"societatea cu raspundere limitata",
    r"sociedade limitada",
    r"sociedad en comandita por acciones",
    r"societe en commandite par actions",
    r"societate in comandita pe actiuni",
    r"sociedade em comandita por acoes",
    r"societa in accomandita per azioni",
    r"sociedad en comandita simple",
    r"societe en commandite simple",
    r"societate in comandita simpla",
    r"sociedade em comandita simples",
    r"societa in accomandita semplice",
    r"akciova spolecnost",
    r"federalny statny podnik",
    r"empresa estatal federal",
    // Germany
    r"gesellschaft mit beschr[aä]nkter haftung",
    r"unternehmergesellschaft haftungsbeschrankt",
    // United Kingdom / United States
    r"limited liability company",
    r"public limited company",
    r"private limited company",
    r"limited liability partnership",
    r"joint stock commercial bank",
    r"as a private joint stock company",
    r"open joint stock company",
    r"private joint stock company",
    r"public joint stock company",
    r"closed joint stock company",
    r"federal state enterprise",
    r"federal state institution",
    r"joint stock company",
    r"joint stock bank",
    r"joint stock holding",
    r"autonomous non commercial organisation",
    r"federal state governmental institution",
    r"charity association",
    r"limited",
    r"incorporated",
    r"corporation",
    r"company",
    // Russia (transliterated)
    r"obshchestvo s ogranichennoy otvetstvennostyu",
    r"obshchestvo s ogranichennoi otvetstvennostyu",
    r"obshchestvo s ogranichennoj otvetstvennostyu",
    r"publichnoe aktsionernoe obshchestvo",
    r"publichnoe aktsionernoe obschestvo",
    r"aktsionernoe obshchestvo aktsionerny",
    r"aktsionernoe obshchestvo aktsionernoe",
    r"aktsionernoye obshchestvo",
    r"aktsionernoe obshchestvo",
    r"aktsionerny kommercheski bank",
    r"otkrytoe aktsionernoe obschchestvo",
    r"otkrytoe aktsionernoe obshchestvo aktsionerny",
    r"otkrytoe aktsionernoe obshchestvo",
    r"federalny statny predpriyatiye",
    // Iran
    r"sherkat sahami khass",
    r"sherkat sahami omumi",
    r"sherkat ba masouliyat mahdood",
    r"sherkat sahami",
    r"shakad sanati",
    r"shakad sanat",
    // Pakistan
    r"private limited",
    // United Arab Emirates
    r"free zone establishment",
    r"free zone company",
    // China
    r"limited company",
    r"group company",
    // ===== Short forms =====
    r"s\s+a\s+p\s+i",
    r"sapi",
    r"s\s+de\s+r\s+l\s+de\s+c\s+v",
    r"s de rl de cv",
    r"s\s+de\s+r\s+l",
    r"s de rl",
    r"s\s+a\s+de\s+c\s+v",
    r"sa de cv",
    r"s\s+a",
    r"sa",
    r"s\s+r\s+l",
    r"srl",
    r"s\s+p\s+a",
    r"spa",
    r"s\s+l",
    r"sl",
    r"g\s+m\s+b\s+h",
    r"gmbh",
    r"u\s+g",
    r"ug",
    r"m\s+b\s+h",
    r"mbh",
    r"a\s+g",
    r"ag",
    r"k\s+g",
    r"kg",
    r"l\s+l\s+c",
    r"llc",
    r"l\s+l\s+p",
    r"llp",
    r"l\s+t\s+d",
    r"ltd",
    r"p\s+l\s+c",
    r"plc",
    r"i\s+n\s+c",
    r"inc",
    r"c\s+o\s+r\s+p",
    r"corp",
    r"c\s+o",
    r"co",
    r"o\s+o\s+o",
    r"ooo",
    r"z\s+a\s+o",
    r"zao",
    r"p\s+a\s+o",
    r"pao",
    r"a\s+o",
    r"ao",
    r"p\s+j\s+s\s+c",
    r"pjsc",
    r"c\s+j\s+s\s+c",
    r"cjsc",
    r"j\s+s\s+c\s+b",
    r"jscb",
    r"j\s+s\s+c",
    r"jsc",
    r"n\s+p\s+p",
    r"npp",
    r"l\s+d\s+a",
    r"lda",
    r"f\s+z\s+e",
    r"fze",
    r"f\s+z\s+c",
    r"fzc",
    r"o\s+a\s+o",
    r"oao",
    r"o\s+j\s+s\s+c",
    r"ojsc",
    r"f\s+g\s+u\s+p",
    r"fgup",
    r"f\s+s\s+u\s+e",
    r"fsue",
    r"j\s+s\s+b",
    r"jsb",
    r"n\s+p\s+o\s+o\s+f",
    r"npo of",
    r"n\s+p\s+o",
    r"npo",
    r"v\s+p\s+k",
    r"vpk",
    r"f\s+s\s+e",
    r"fse",
    r"a\s+n\s+o",
    r"ano",
    r"s\s+h\s+k",
    r"shk",
    r"s\s+h\s+s",
    r"shs",
    r"s\s+h\s+o\s+m",
    r"shom",
    r"s\s+h\s+o",
    r"sho",
    r"s\s+h",
    r"sh",
    r"s\s+s",
    r"ss",
];
