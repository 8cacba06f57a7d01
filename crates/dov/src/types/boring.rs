//! Boreholes (`boring`).

use crate::error::RegistryError;
use crate::field::{ChildType, FieldDescriptor as F, RecordType};

pub const NAME: &str = "boring";
pub const LAYER: &str = "dov-pub:Boringen";
pub const NAMESPACE: &str = "http://dov.vlaanderen.be/ocdov/dov-pub";

pub fn record_type() -> Result<RecordType, RegistryError> {
    RecordType::builder(NAME, LAYER)
        .namespace(NAMESPACE)
        .description(
            "In de DOV-databank is elke boring die geregistreerd is opgenomen. \
             Een boring beschrijft de uitvoering van het boren: locatie, diepte, \
             uitvoerder en de gebruikte boormethodes per diepte-interval.",
        )
        .identity("pkey_boring")
        .field(F::listing("pkey_boring", "fiche", "string")?.with_definition(
            "URL die verwijst naar de gegevens van deze boring op de website. \
             Voeg '.xml' toe om een XML voorstelling van deze gegevens te verkrijgen.",
        ))
        .field(F::listing("boornummer", "boornummer", "string")?.with_definition(
            "Nummer van de boring zoals toegekend door de uitvoerder.",
        ))
        .field(F::listing("x", "X_mL72", "float")?.with_definition(
            "X-coördinaat van de boring in Lambert72 (EPSG:31370).",
        ))
        .field(F::listing("y", "Y_mL72", "float")?.with_definition(
            "Y-coördinaat van de boring in Lambert72 (EPSG:31370).",
        ))
        .field(
            F::detail("mv_mtaw", "/boring/oorspronkelijk_maaiveld/waarde", "float")?
                .with_definition("Maaiveldhoogte in mTAW op dag dat de boring uitgevoerd werd."),
        )
        .field(F::listing("start_boring_mtaw", "Z_mTAW", "float")?.with_definition(
            "Hoogte in mTAW van het startpunt van de boring.",
        ))
        .field(F::listing("gemeente", "gemeente", "string")?.with_definition(
            "Gemeente waarin de boring werd uitgevoerd.",
        ))
        .field(
            F::detail("diepte_boring_van", "/boring/diepte_van", "float")?
                .with_definition("Startdiepte van de boring (in meter).")
                .not_null(),
        )
        .field(F::listing("diepte_boring_tot", "diepte_tot_m", "float")?.with_definition(
            "Einddiepte van de boring (in meter).",
        ))
        .field(F::listing("datum_aanvang", "datum_aanvang", "date")?.with_definition(
            "Startdatum van de boring.",
        ))
        .field(F::listing("uitvoerder", "uitvoerder", "string")?.with_definition(
            "Naam van de uitvoerder van de boring.",
        ))
        .field(
            F::detail("boorgatmeting", "/boring/boorgatmeting/uitgevoerd", "boolean")?
                .with_definition("Is er een boorgatmeting uitgevoerd (ja/nee)."),
        )
        .child(
            ChildType::new("boormethode", ".//boring/details/boormethode")?
                .with_field(F::detail("diepte_methode_van", "/van", "float")?.with_definition(
                    "Bovenkant van de laag die met een bepaalde methode aangeboord werd, \
                     in meter.",
                ))
                .with_field(F::detail("diepte_methode_tot", "/tot", "float")?.with_definition(
                    "Onderkant van de laag die met een bepaalde methode aangeboord werd, \
                     in meter.",
                ))
                .with_field(F::detail("boormethode", "/methode", "string")?.with_definition(
                    "Boormethode voor het diepte-interval.",
                )),
        )
        .build()
}
