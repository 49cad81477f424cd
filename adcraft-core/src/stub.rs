//! Stock collaborators for running the engine without an AI backend.
//!
//! Zones are fixed, copy comes from a built-in multilingual pool and the
//! advisor always recommends the first registered family.

use crate::catalog::FamilyDefinition;
use crate::collab::{CopyGenerator, FamilyAdvisor, ZoneAnalyzer};
use crate::error::{EngineError, EngineResult};
use crate::model::{
    new_id, Angle, CopyPool, CopySlot, FamilyId, ImageAsset, Language, NormRect, SafeZones, SlotType,
    Zone,
};

/// Top-left, bottom band and top-right zones around a centred product.
pub fn stock_safe_zones(image_id: &str) -> SafeZones {
    SafeZones {
        image_id: image_id.to_string(),
        avoid_regions: vec![NormRect::new(0.2, 0.25, 0.6, 0.5)],
        zones: vec![
            Zone { id: "A".into(), rect: NormRect::new(0.04, 0.03, 0.5, 0.15) },
            Zone { id: "B".into(), rect: NormRect::new(0.04, 0.78, 0.92, 0.19) },
            Zone { id: "C".into(), rect: NormRect::new(0.6, 0.05, 0.36, 0.25) },
        ],
    }
}

type Tagged = (Angle, &'static str);

fn headlines(language: Language) -> [Tagged; 9] {
    use Angle::*;
    match language {
        Language::En => [
            (Benefit, "Salon look in 5 minutes"),
            (Benefit, "No glue, no mess, no stress"),
            (Curiosity, "What if nails lasted 2 weeks?"),
            (Urgency, "Limited drop \u{2014} grab yours"),
            (Emotional, "You deserve nails that turn heads"),
            (Aspirational, "Effortlessly you."),
            (Aspirational, "Crafted for the discerning few."),
            (Story, "She stopped getting manicures. Here's why."),
            (Contrast, "Salon price. Home speed."),
        ],
        Language::De => [
            (Benefit, "Salon-Look in 5 Minuten"),
            (Benefit, "Kein Kleber, kein Chaos, kein Stress"),
            (Curiosity, "Was, wenn N\u{e4}gel 2 Wochen halten?"),
            (Urgency, "Limitierte Edition \u{2014} jetzt sichern"),
            (Emotional, "Du verdienst N\u{e4}gel, die Blicke fangen"),
            (Aspirational, "M\u{fc}helose Eleganz."),
            (Aspirational, "F\u{fc}r anspruchsvolle Geschm\u{e4}cker."),
            (Story, "Sie h\u{f6}rte auf, zum Nagelstudio zu gehen. Das ist der Grund."),
            (Contrast, "Salon-Qualit\u{e4}t. Heimvorteil."),
        ],
        Language::Fr => [
            (Benefit, "Look salon en 5 minutes"),
            (Benefit, "Sans colle, sans d\u{e9}sordre, sans stress"),
            (Curiosity, "Et si vos ongles duraient 2 semaines ?"),
            (Urgency, "\u{c9}dition limit\u{e9}e \u{2014} commandez vite"),
            (Emotional, "Vous m\u{e9}ritez des ongles qui font tourner les t\u{ea}tes"),
            (Aspirational, "L'\u{e9}l\u{e9}gance, naturellement."),
            (Aspirational, "Pour celles qui savent."),
            (Story, "Elle a arr\u{ea}t\u{e9} les manucures. Voici pourquoi."),
            (Contrast, "Prix salon. Rapidit\u{e9} maison."),
        ],
        Language::Es => [
            (Benefit, "Look de sal\u{f3}n en 5 minutos"),
            (Benefit, "Sin pegamento, sin desorden, sin estr\u{e9}s"),
            (Curiosity, "\u{bf}Y si las u\u{f1}as duraran 2 semanas?"),
            (Urgency, "Edici\u{f3}n limitada \u{2014} consigue la tuya"),
            (Emotional, "Mereces u\u{f1}as que roben miradas"),
            (Aspirational, "Elegancia sin esfuerzo."),
            (Aspirational, "Para las que lo saben."),
            (Story, "Dej\u{f3} de ir a la manicura. Esto es lo que pas\u{f3}."),
            (Contrast, "Precio de sal\u{f3}n. Velocidad en casa."),
        ],
    }
}

fn quotes(language: Language) -> [(&'static str, &'static str); 3] {
    match language {
        Language::En => [
            (
                "I literally threw away my nail kit after using these. Zero chipping, zero hassle, zero regrets.",
                "\u{2014} Emma R., Verified Buyer",
            ),
            (
                "My manicurist was shocked these aren't gel. Two weeks in and they still look perfect.",
                "\u{2014} Sophie M., Verified Buyer",
            ),
            (
                "I've tried every press-on brand out there. Nothing comes close to this quality.",
                "\u{2014} Jade L., Verified Buyer",
            ),
        ],
        Language::De => [
            (
                "Ich habe mein Nagelset weggeworfen, nachdem ich diese benutzt habe. Kein Absplittern, kein Aufwand, keine Reue.",
                "\u{2014} Emma R., Verifizierte K\u{e4}uferin",
            ),
            (
                "Meine Nageldesignerin war schockiert, dass das kein Gel ist. Zwei Wochen sp\u{e4}ter sehen sie noch perfekt aus.",
                "\u{2014} Sophie M., Verifizierte K\u{e4}uferin",
            ),
            (
                "Ich habe jede Marke ausprobiert. Nichts kommt an diese Qualit\u{e4}t heran.",
                "\u{2014} Jade L., Verifizierte K\u{e4}uferin",
            ),
        ],
        Language::Fr => [
            (
                "J'ai litt\u{e9}ralement jet\u{e9} ma trousse \u{e0} ongles. Z\u{e9}ro \u{e9}caillage, z\u{e9}ro tracas, z\u{e9}ro regret.",
                "\u{2014} Emma R., Acheteuse v\u{e9}rifi\u{e9}e",
            ),
            (
                "Ma manucure \u{e9}tait choqu\u{e9}e que ce ne soit pas du gel. Deux semaines plus tard, toujours parfait.",
                "\u{2014} Sophie M., Acheteuse v\u{e9}rifi\u{e9}e",
            ),
            (
                "J'ai essay\u{e9} toutes les marques. Rien n'\u{e9}gale cette qualit\u{e9}.",
                "\u{2014} Jade L., Acheteuse v\u{e9}rifi\u{e9}e",
            ),
        ],
        Language::Es => [
            (
                "Literalmente tir\u{e9} mi kit de u\u{f1}as despu\u{e9}s de usarlas. Sin astillas, sin complicaciones, sin arrepentimientos.",
                "\u{2014} Emma R., Compradora verificada",
            ),
            (
                "Mi manicurista no pod\u{ed}a creer que no fueran gel. Dos semanas despu\u{e9}s y siguen perfectas.",
                "\u{2014} Sophie M., Compradora verificada",
            ),
            (
                "He probado todas las marcas. Nada se acerca a esta calidad.",
                "\u{2014} Jade L., Compradora verificada",
            ),
        ],
    }
}

fn subtexts(language: Language) -> [Tagged; 8] {
    use Angle::*;
    match language {
        Language::En => [
            (Benefit, "Professional results at home"),
            (Curiosity, "See what you've been missing"),
            (Urgency, "Limited time \u{b7} Limited stock"),
            (Emotional, "Because you deserve the best"),
            (Aspirational, "Luxury Collection"),
            (Aspirational, "For the discerning few"),
            (Story, "Her secret. Now yours."),
            (Contrast, "Salon quality. Home price."),
        ],
        Language::De => [
            (Benefit, "Professionelle Ergebnisse zu Hause"),
            (Curiosity, "Entdecke, was du verpasst hast"),
            (Urgency, "Limitiert \u{b7} Jetzt sichern"),
            (Emotional, "Weil du das Beste verdienst"),
            (Aspirational, "Luxuskollektion"),
            (Aspirational, "F\u{fc}r anspruchsvolle Geschm\u{e4}cker"),
            (Story, "Ihr Geheimnis. Jetzt deins."),
            (Contrast, "Salon-Qualit\u{e4}t. Heimvorteil."),
        ],
        Language::Fr => [
            (Benefit, "R\u{e9}sultats professionnels \u{e0} domicile"),
            (Curiosity, "D\u{e9}couvrez ce que vous manquiez"),
            (Urgency, "Limit\u{e9} \u{b7} Commandez vite"),
            (Emotional, "Parce que vous m\u{e9}ritez le meilleur"),
            (Aspirational, "Collection Luxe"),
            (Aspirational, "Pour celles qui savent"),
            (Story, "Son secret. Maintenant le v\u{f4}tre."),
            (Contrast, "Qualit\u{e9} salon. Prix maison."),
        ],
        Language::Es => [
            (Benefit, "Resultados profesionales en casa"),
            (Curiosity, "Descubre lo que te has perdido"),
            (Urgency, "Limitado \u{b7} Consigue el tuyo"),
            (Emotional, "Porque mereces lo mejor"),
            (Aspirational, "Colecci\u{f3}n de Lujo"),
            (Aspirational, "Para las que lo saben"),
            (Story, "Su secreto. Ahora el tuyo."),
            (Contrast, "Calidad sal\u{f3}n. Precio de casa."),
        ],
    }
}

/// The full stock pool: 20 slots per language, fresh slot ids on every call.
pub fn stock_copy_pool(image_id: &str) -> CopyPool {
    let mut slots = Vec::with_capacity(80);
    for language in Language::ALL {
        let tagged = |slot_type: SlotType, (angle, text): Tagged| CopySlot {
            id: new_id("sl"),
            language,
            slot_type,
            text: text.to_string(),
            angle: Some(angle),
            attribution: None,
        };
        slots.extend(headlines(language).into_iter().map(|t| tagged(SlotType::Headline, t)));
        slots.extend(quotes(language).into_iter().map(|(text, attribution)| CopySlot {
            id: new_id("sl"),
            language,
            slot_type: SlotType::Quote,
            text: text.to_string(),
            angle: None,
            attribution: Some(attribution.to_string()),
        }));
        slots.extend(subtexts(language).into_iter().map(|t| tagged(SlotType::Subtext, t)));
    }
    CopyPool { image_id: image_id.to_string(), slots }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StockZoneAnalyzer;

impl ZoneAnalyzer for StockZoneAnalyzer {
    fn analyze(&self, image: &ImageAsset, _bytes: &[u8]) -> EngineResult<SafeZones> {
        Ok(stock_safe_zones(&image.id))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StockCopyGenerator;

impl CopyGenerator for StockCopyGenerator {
    fn generate(&self, image: &ImageAsset, _bytes: &[u8]) -> EngineResult<CopyPool> {
        Ok(stock_copy_pool(&image.id))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FirstFamilyAdvisor;

impl FamilyAdvisor for FirstFamilyAdvisor {
    fn recommend(&self, _image: &ImageAsset, families: &[FamilyDefinition]) -> EngineResult<FamilyId> {
        families
            .first()
            .map(|f| f.id.clone())
            .ok_or_else(|| EngineError::Upstream("no families to recommend from".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stock_pool_shape() {
        let pool = stock_copy_pool("img_1");
        assert_eq!(pool.slots.len(), 80);
        for language in Language::ALL {
            assert_eq!(pool.filter(language, SlotType::Headline).len(), 9);
            assert_eq!(pool.filter(language, SlotType::Quote).len(), 3);
            assert_eq!(pool.filter(language, SlotType::Subtext).len(), 8);
        }
        let ids: HashSet<_> = pool.slots.iter().map(|s| &s.id).collect();
        assert_eq!(ids.len(), 80);
    }

    #[test]
    fn test_quotes_carry_attribution_and_no_angle() {
        let pool = stock_copy_pool("img_1");
        for slot in pool.slots.iter().filter(|s| s.slot_type == SlotType::Quote) {
            assert!(slot.angle.is_none());
            assert!(slot.attribution.as_deref().is_some_and(|a| a.starts_with('\u{2014}')));
        }
    }

    #[test]
    fn test_every_headline_angle_has_a_subtext_partner() {
        let pool = stock_copy_pool("img_1");
        for language in Language::ALL {
            let sub_angles: HashSet<_> =
                pool.filter(language, SlotType::Subtext).iter().map(|s| s.angle).collect();
            for headline in pool.filter(language, SlotType::Headline) {
                assert!(sub_angles.contains(&headline.angle));
            }
        }
    }

    #[test]
    fn test_stock_zones_are_inside_the_image() {
        let zones = stock_safe_zones("img_1");
        assert_eq!(zones.zones.len(), 3);
        for z in &zones.zones {
            assert!(z.rect.x + z.rect.w <= 1.0 && z.rect.y + z.rect.h <= 1.0);
        }
    }
}
