//! Interpretations of boreholes and cone penetration tests.
//!
//! All interpretation layers share the `interpretaties` namespace and a common
//! set of listing fields. Informal and formal stratigraphy can belong to a
//! borehole or to a cone penetration test; the link is split over two derived
//! fields depending on `Type_proef`.

use crate::error::RegistryError;
use crate::field::{ChildType, Derivation, FieldDescriptor as F, RecordType, RecordTypeBuilder};

pub const NAMESPACE: &str = "http://dov.vlaanderen.be/ocdov/interpretaties";

fn common(name: &str, layer: &str, description: &str) -> Result<RecordTypeBuilder, RegistryError> {
    Ok(RecordType::builder(name, &format!("interpretaties:{}", layer))
        .namespace(NAMESPACE)
        .description(description)
        .identity("pkey_interpretatie")
        .field(
            F::listing("pkey_interpretatie", "Interpretatiefiche", "string")?.with_definition(
                "URL die verwijst naar de gegevens van deze interpretatie. Voeg '.xml' \
                 toe om een XML voorstelling van deze gegevens te verkrijgen.",
            ),
        ))
}

/// Adds `pkey_boring` and `pkey_sondering`, derived from `Type_proef`.
fn linked_to_proef(builder: RecordTypeBuilder, what: &str) -> Result<RecordTypeBuilder, RegistryError> {
    Ok(builder
        .field(
            F::derived(
                "pkey_boring",
                Derivation::when_equals("Type_proef", "Boring", "Proeffiche")?,
                "string",
            )?
            .with_definition(&format!(
                "URL die verwijst naar de gegevens van de boring waaraan deze {} \
                 gekoppeld is (indien gekoppeld aan een boring).",
                what
            )),
        )
        .field(
            F::derived(
                "pkey_sondering",
                Derivation::when_equals("Type_proef", "Sondering", "Proeffiche")?,
                "string",
            )?
            .with_definition(&format!(
                "URL die verwijst naar de gegevens van de sondering waaraan deze {} \
                 gekoppeld is (indien gekoppeld aan een sondering).",
                what
            )),
        ))
}

fn linked_to_boring(builder: RecordTypeBuilder) -> Result<RecordTypeBuilder, RegistryError> {
    Ok(builder.field(
        F::listing("pkey_boring", "Proeffiche", "string")?.with_definition(
            "URL die verwijst naar de gegevens van de boring waaraan deze \
             interpretatie gekoppeld is.",
        ),
    ))
}

fn trailing(builder: RecordTypeBuilder) -> Result<RecordTypeBuilder, RegistryError> {
    Ok(builder
        .field(
            F::listing("betrouwbaarheid_interpretatie", "Betrouwbaarheid", "string")?
                .with_definition("Betrouwbaarheid van de interpretatie (goed, twijfelachtig, onbekend)."),
        )
        .field(F::listing("x", "X_mL72", "float")?.with_definition(
            "X-coördinaat van de proef in Lambert72 (EPSG:31370).",
        ))
        .field(F::listing("y", "Y_mL72", "float")?.with_definition(
            "Y-coördinaat van de proef in Lambert72 (EPSG:31370).",
        )))
}

fn depth_fields(child: ChildType, what: &str) -> Result<ChildType, RegistryError> {
    Ok(child
        .with_field(F::detail("diepte_laag_van", "/van", "float")?.with_definition(&format!(
            "Diepte van de bovenkant van de laag {} in meter.",
            what
        )))
        .with_field(F::detail("diepte_laag_tot", "/tot", "float")?.with_definition(&format!(
            "Diepte van de onderkant van de laag {} in meter.",
            what
        ))))
}

pub fn informele_stratigrafie() -> Result<RecordType, RegistryError> {
    let builder = common(
        "informele_stratigrafie",
        "informele_stratigrafie",
        "Informele stratigrafie: een vrije beschrijving van de stratigrafische \
         eenheden die in een boring of sondering herkend worden.",
    )?;
    let builder = trailing(linked_to_proef(builder, "informele stratigrafie")?)?;
    let laag = depth_fields(
        ChildType::new("informele_stratigrafie_laag", ".//informelestratigrafie/laag")?,
        "informele stratigrafie",
    )?
    .with_field(F::detail("beschrijving", "/beschrijving", "string")?.with_definition(
        "Benoeming van de eenheid van de laag informele stratigrafie in vrije tekst \
         (onbeperkt in lengte).",
    ));
    builder.child(laag).build()
}

pub fn formele_stratigrafie() -> Result<RecordType, RegistryError> {
    let builder = common(
        "formele_stratigrafie",
        "formele_stratigrafie",
        "Formele stratigrafie: de indeling van de lagen van een boring of sondering \
         volgens de formele lithostratigrafische eenheden van Vlaanderen.",
    )?;
    let builder = trailing(linked_to_proef(builder, "formele stratigrafie")?)?;
    let laag = depth_fields(
        ChildType::new("formele_stratigrafie_laag", ".//formelestratigrafie/laag")?,
        "formele stratigrafie",
    )?
    .with_field(F::detail("lid1", "/lid1", "string")?.with_definition(
        "Eerste eenheid van de laag formele stratigrafie.",
    ))
    .with_field(
        F::detail("relatie_lid1_lid2", "/relatie_lid1_lid2", "string")?
            .with_definition("Type relatie tussen de eerste en de tweede eenheid van de laag."),
    )
    .with_field(F::detail("lid2", "/lid2", "string")?.with_definition(
        "Tweede eenheid van de laag formele stratigrafie. Indien niet ingevuld wordt \
         dezelfde waarde als lid1 verondersteld.",
    ));
    builder.child(laag).build()
}

pub fn hydrogeologische_stratigrafie() -> Result<RecordType, RegistryError> {
    let builder = common(
        "hydrogeologische_stratigrafie",
        "hydrogeologische_stratigrafie",
        "Hydrogeologische stratigrafie: de indeling van de lagen van een boring \
         volgens de hydrogeologische codering (HCOV).",
    )?;
    let builder = trailing(linked_to_boring(builder)?)?;
    let laag = depth_fields(
        ChildType::new(
            "hydrogeologische_stratigrafie_laag",
            ".//hydrogeologischeinterpretatie/laag",
        )?,
        "hydrogeologische stratigrafie",
    )?
    .with_field(F::detail("aquifer", "/aquifer", "string")?.with_definition(
        "code van de watervoerende laag waarin de laag Hydrogeologische stratigrafie \
         zich bevindt.",
    ));
    builder.child(laag).build()
}

pub fn lithologische_beschrijvingen() -> Result<RecordType, RegistryError> {
    let builder = common(
        "lithologische_beschrijvingen",
        "lithologische_beschrijvingen",
        "Lithologische beschrijvingen: een beschrijving in vrije tekst van de \
         lithologie van de lagen van een boring.",
    )?;
    let builder = trailing(linked_to_boring(builder)?)?;
    let laag = depth_fields(
        ChildType::new("lithologische_beschrijving_laag", ".//lithologischebeschrijving/laag")?,
        "lithologische beschrijving",
    )?
    .with_field(F::detail("beschrijving", "/beschrijving", "string")?.with_definition(
        "Lithologische beschrijving van de laag in vrije tekst (onbeperkt in lengte)",
    ));
    builder.child(laag).build()
}

pub fn gecodeerde_lithologie() -> Result<RecordType, RegistryError> {
    let builder = common(
        "gecodeerde_lithologie",
        "gecodeerde_lithologie",
        "Gecodeerde lithologie: de lithologie van de lagen van een boring, \
         gecodeerd als hoofdgrondsoorten en bijmengingen.",
    )?;
    let builder = trailing(linked_to_boring(builder)?)?;

    let mut laag = depth_fields(
        ChildType::new("gecodeerde_lithologie_laag", ".//gecodeerdelithologie/laag")?,
        "gecodeerde lithologie",
    )?
    .with_field(
        F::detail("hoofdnaam1_grondsoort", "/hoofdnaam[1]/grondsoort", "string")?
            .with_definition("Primaire grondsoort (als code) van de laag gecodeerde lithologie"),
    )
    .with_field(
        F::detail("hoofdnaam2_grondsoort", "/hoofdnaam[2]/grondsoort", "string")?
            .with_definition("Secundaire grondsoort (als code) van de laag gecodeerde lithologie"),
    );

    for n in 1..=3 {
        laag = laag
            .with_field(
                F::detail(
                    &format!("bijmenging{}_plaatselijk", n),
                    &format!("/bijmenging[{}]/plaatselijk", n),
                    "boolean",
                )?
                .with_definition("plaatselijk of niet-plaatselijk"),
            )
            .with_field(
                F::detail(
                    &format!("bijmenging{}_hoeveelheid", n),
                    &format!("/bijmenging[{}]/hoeveelheid", n),
                    "string",
                )?
                .with_definition("aanduiding van de hoeveelheid bijmenging"),
            )
            .with_field(
                F::detail(
                    &format!("bijmenging{}_grondsoort", n),
                    &format!("/bijmenging[{}]/grondsoort", n),
                    "string",
                )?
                .with_definition(
                    "type grondsoort (als code) van de laag gecodeerde lithologie of \
                     geotechnische codering",
                ),
            );
    }

    builder.child(laag).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Origin;

    #[test]
    fn test_formele_stratigrafie_fields() {
        let fs = formele_stratigrafie().unwrap();
        assert_eq!(
            fs.field_names(true),
            vec![
                "pkey_interpretatie",
                "pkey_boring",
                "pkey_sondering",
                "betrouwbaarheid_interpretatie",
                "x",
                "y",
                "diepte_laag_van",
                "diepte_laag_tot",
                "lid1",
                "relatie_lid1_lid2",
                "lid2",
            ]
        );
        assert_eq!(fs.field("pkey_sondering").unwrap().origin(), Origin::Derived);
        assert_eq!(fs.layer(), "interpretaties:formele_stratigrafie");
    }

    #[test]
    fn test_boring_only_interpretations_list_proeffiche() {
        let hs = hydrogeologische_stratigrafie().unwrap();
        assert_eq!(
            hs.field_names(false),
            vec!["pkey_interpretatie", "pkey_boring", "betrouwbaarheid_interpretatie", "x", "y"]
        );
        assert_eq!(hs.field("pkey_boring").unwrap().origin(), Origin::Listing);
    }

    #[test]
    fn test_gecodeerde_lithologie_positional_fields() {
        let gl = gecodeerde_lithologie().unwrap();
        let laag = &gl.children()[0];
        assert_eq!(laag.fields().len(), 13);
        let field = gl.field("bijmenging2_grondsoort").unwrap();
        assert_eq!(field.locator().unwrap().as_str(), "/bijmenging[2]/grondsoort");
    }
}
